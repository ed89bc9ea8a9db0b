//! Live query subscriptions.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::SyncError;
use crate::store::{decode_snapshot, Record, SnapshotStream};

/// One delivery to a subscription handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    /// Set on the final delivery of a failed subscription; `items` is then empty.
    pub error: Option<SyncError>,
}

impl<T> Snapshot<T> {
    pub fn ok(items: Vec<T>) -> Self {
        Self { items, error: None }
    }

    pub fn failed(error: SyncError) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Handle to a running subscription. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Drives `snapshots` on a background task, decoding each snapshot for
    /// `handler`. A store error is delivered once as an empty failed snapshot
    /// and ends the subscription; there is no retry.
    pub(crate) fn spawn<T, H>(
        label: String,
        mut snapshots: SnapshotStream,
        mut handler: H,
    ) -> Self
    where
        T: Record + Send + 'static,
        H: FnMut(Snapshot<T>) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(next) = snapshots.next().await {
                match next {
                    Ok(docs) => {
                        debug!("{}: snapshot of {} documents", label, docs.len());
                        handler(Snapshot::ok(decode_snapshot(&docs)));
                    }
                    Err(e) => {
                        warn!("{}: subscription failed: {}", label, e);
                        handler(Snapshot::failed(SyncError::Subscription(e.to_string())));
                        break;
                    }
                }
            }
        });
        Self { task: Some(task) }
    }

    /// Delivers `items` once, synchronously, and holds no task.
    pub(crate) fn immediate<T, H>(items: Vec<T>, mut handler: H) -> Self
    where
        H: FnMut(Snapshot<T>),
    {
        handler(Snapshot::ok(items));
        Self { task: None }
    }

    /// Delivers one failed snapshot, synchronously, and holds no task.
    pub(crate) fn failed<T, H>(error: SyncError, mut handler: H) -> Self
    where
        H: FnMut(Snapshot<T>),
    {
        handler(Snapshot::failed(error));
        Self { task: None }
    }

    /// Whether snapshots may still arrive.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Handler that forwards every snapshot into a channel, for consumers that
/// prefer to `recv().await` rather than run a callback.
pub fn snapshot_channel<T>() -> (
    impl FnMut(Snapshot<T>) + Send + 'static,
    mpsc::UnboundedReceiver<Snapshot<T>>,
)
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |snapshot: Snapshot<T>| {
        let _ = tx.send(snapshot);
    };
    (handler, rx)
}
