//! Coalesced writes for set edits.
//!
//! Reps and weight change on every keystroke. [`SetWriteBuffer`] keeps the
//! latest edit per set and writes it once the edits have been quiet for
//! `SyncSettings::set_write_debounce`, or on an explicit flush.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::completion::Outcome;
use super::SyncCoordinator;
use crate::models::WorkoutSet;

enum Command {
    Edit(WorkoutSet),
    Flush(oneshot::Sender<Vec<Outcome>>),
}

/// Debounced writer for the sets of one exercise.
///
/// Dropping the buffer writes whatever is still pending.
pub struct SetWriteBuffer {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl SetWriteBuffer {
    pub fn spawn(
        coordinator: SyncCoordinator,
        plan_id: impl Into<String>,
        exercise_id: impl Into<String>,
    ) -> Self {
        let quiet = coordinator.settings().set_write_debounce;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(
            coordinator,
            plan_id.into(),
            exercise_id.into(),
            quiet,
            rx,
        ));
        Self { tx, task }
    }

    /// Buffers the new state of a set, replacing any earlier pending edit.
    pub fn edit(&self, set: WorkoutSet) -> bool {
        self.tx.send(Command::Edit(set)).is_ok()
    }

    /// Writes all pending edits now and returns their outcomes.
    pub async fn flush(&self) -> Vec<Outcome> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Flush(reply)).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Writes pending edits and waits for the writer to stop.
    pub async fn close(self) {
        let Self { tx, task } = self;
        drop(tx);
        let _ = task.await;
    }
}

async fn run(
    coordinator: SyncCoordinator,
    plan_id: String,
    exercise_id: String,
    quiet: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut pending: BTreeMap<String, WorkoutSet> = BTreeMap::new();
    loop {
        let next = if pending.is_empty() {
            rx.recv().await
        } else {
            match tokio::time::timeout(quiet, rx.recv()).await {
                Ok(command) => command,
                Err(_) => {
                    write_pending(&coordinator, &plan_id, &exercise_id, &mut pending).await;
                    continue;
                }
            }
        };

        match next {
            Some(Command::Edit(set)) => {
                pending.insert(set.id.clone(), set);
            }
            Some(Command::Flush(reply)) => {
                let outcomes =
                    write_pending(&coordinator, &plan_id, &exercise_id, &mut pending).await;
                let _ = reply.send(outcomes);
            }
            None => {
                write_pending(&coordinator, &plan_id, &exercise_id, &mut pending).await;
                break;
            }
        }
    }
}

async fn write_pending(
    coordinator: &SyncCoordinator,
    plan_id: &str,
    exercise_id: &str,
    pending: &mut BTreeMap<String, WorkoutSet>,
) -> Vec<Outcome> {
    let sets: Vec<WorkoutSet> = std::mem::take(pending).into_values().collect();
    if sets.is_empty() {
        return Vec::new();
    }

    debug!("Writing {} buffered set edits", sets.len());
    let outcomes =
        join_all(sets.iter().map(|s| coordinator.update_set(plan_id, exercise_id, s))).await;
    for (set, outcome) in sets.iter().zip(&outcomes) {
        if let Err(e) = outcome {
            warn!("Failed to write set {}: {}", set.id, e);
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentity;
    use crate::store::{CollectionPath, MemoryStore, Record, RemoteStore};
    use std::sync::Arc;

    fn setup() -> (SetWriteBuffer, MemoryStore) {
        let store = MemoryStore::new();
        let coordinator = SyncCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(MemoryIdentity::signed_in("u1")),
        );
        (SetWriteBuffer::spawn(coordinator, "p1", "e1"), store)
    }

    async fn stored_set(store: &MemoryStore, id: &str) -> Option<WorkoutSet> {
        store
            .get_document(&CollectionPath::sets("u1", "p1", "e1").doc(id))
            .await
            .unwrap()
            .map(|doc| WorkoutSet::from_document(&doc).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_coalesce_after_quiet_time() {
        let (buffer, store) = setup();
        buffer.edit(WorkoutSet::new(1, 5, 60.0).with_id("s1"));
        buffer.edit(WorkoutSet::new(1, 8, 60.0).with_id("s1"));
        buffer.edit(WorkoutSet::new(2, 6, 55.0).with_id("s2"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.mutation_calls(), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.mutation_calls(), 2);
        assert_eq!(stored_set(&store, "s1").await.unwrap().reps, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_edit_restarts_quiet_time() {
        let (buffer, store) = setup();
        for reps in 1..=4 {
            buffer.edit(WorkoutSet::new(1, reps, 60.0).with_id("s1"));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(store.mutation_calls(), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.mutation_calls(), 1);
    }

    #[tokio::test]
    async fn test_flush_writes_immediately() {
        let (buffer, store) = setup();
        buffer.edit(WorkoutSet::new(1, 12, 20.0).with_id("s1"));

        let outcomes = buffer.flush().await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_ok());
        assert_eq!(stored_set(&store, "s1").await.unwrap().weight, 20.0);
        assert!(buffer.flush().await.is_empty());
    }

    #[tokio::test]
    async fn test_close_writes_pending() {
        let (buffer, store) = setup();
        buffer.edit(WorkoutSet::new(3, 4, 100.0).with_id("s3"));
        buffer.close().await;
        assert!(stored_set(&store, "s3").await.is_some());
    }
}
