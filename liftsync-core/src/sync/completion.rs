//! Single-assignment completion for coordinator mutations.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::SyncError;

/// Success branch of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Id of the created document; `None` for updates and deletes.
    pub id: Option<String>,
    /// `false` when the fallback timer answered before the store did. The
    /// write is still queued and its final outcome is never reported.
    pub confirmed: bool,
}

impl Ack {
    pub fn confirmed(id: Option<String>) -> Self {
        Self {
            id,
            confirmed: true,
        }
    }

    pub fn queued(id: Option<String>) -> Self {
        Self {
            id,
            confirmed: false,
        }
    }
}

/// Result delivered exactly once per mutation.
pub type Outcome = Result<Ack, SyncError>;

/// Converts an outcome into the `(success, id_or_error)` pair UI callbacks take.
pub fn into_parts(outcome: Outcome) -> (bool, Option<String>) {
    match outcome {
        Ok(ack) => (true, ack.id),
        Err(e) => (false, Some(e.to_string())),
    }
}

/// Runs `operation` in the background and hands its outcome to `callback`.
///
/// The callback runs exactly once, on the task that resolved the operation.
pub fn dispatch<F, C>(operation: F, callback: C) -> JoinHandle<()>
where
    F: Future<Output = Outcome> + Send + 'static,
    C: FnOnce(bool, Option<String>) + Send + 'static,
{
    tokio::spawn(async move {
        let (success, detail) = into_parts(operation.await);
        callback(success, detail);
    })
}

/// One-shot result cell shared by the racing arms of a mutation.
///
/// The first `fire` wins; later calls find the cell empty and return `false`.
#[derive(Clone)]
pub(crate) struct OnceSignal {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl OnceSignal {
    pub fn new() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    pub fn fire(&self, outcome: Outcome) -> bool {
        let sender = self.slot.lock().take();
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_signal_fires_once() {
        let (signal, rx) = OnceSignal::new();
        let other = signal.clone();

        assert!(signal.fire(Ok(Ack::confirmed(Some("a".to_string())))));
        assert!(!other.fire(Ok(Ack::queued(Some("a".to_string())))));

        let outcome = rx.await.unwrap().unwrap();
        assert!(outcome.confirmed);
    }

    #[test]
    fn test_into_parts() {
        assert_eq!(
            into_parts(Ok(Ack::queued(Some("p1".to_string())))),
            (true, Some("p1".to_string()))
        );
        assert_eq!(into_parts(Ok(Ack::confirmed(None))), (true, None));
        assert_eq!(
            into_parts(Err(SyncError::Validation("Plan ID is empty.".to_string()))),
            (false, Some("Plan ID is empty.".to_string()))
        );
    }

    #[tokio::test]
    async fn test_dispatch_invokes_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        dispatch(async { Ok(Ack::confirmed(None)) }, move |success, detail| {
            assert!(success);
            assert!(detail.is_none());
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
