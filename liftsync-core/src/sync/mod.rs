//! Client-side coordination between UI intents and the remote store.

mod completion;
mod coordinator;
mod debounce;
mod error;
mod local;
mod subscription;

pub use completion::{dispatch, into_parts, Ack, Outcome};
pub use coordinator::{SyncCoordinator, SyncSettings};
pub use debounce::SetWriteBuffer;
pub use error::SyncError;
pub use local::{LocalPlanStore, MemoryLocalStore, NoopLocalStore};
pub use subscription::{snapshot_channel, Snapshot, Subscription};
