//! LiftSync Core Library
//!
//! Training data models, the remote store abstraction, and the client-side
//! coordination layer that sits between UI intents and a realtime document
//! store: optimistic writes, live subscriptions, drag reordering with
//! minimal-diff persistence, and the exercise picker view.

pub mod identity;
pub mod models;
pub mod ordering;
pub mod picker;
pub mod store;
pub mod sync;

pub use identity::{AuthError, AuthSession, AuthState, IdentityProvider, MemoryIdentity};
pub use models::{
    CustomExercise, DefinitionSource, Exercise, ExerciseDefinition, TemplateExercise,
    TrainingPlan, User, WorkoutSet,
};
pub use ordering::{
    move_item, next_set_number, reindex, renumber_after_delete, DragState, InvalidItemHeight,
    Positioned, ReorderList,
};
pub use picker::{ExercisePicker, NewExerciseHandoff};
pub use store::{
    AutomergeStore, CollectionPath, DecodeError, Document, DocumentPath, FieldValue, Fields,
    MemoryStore, Query, Record, RemoteStore, StoreError,
};
pub use sync::{
    dispatch, into_parts, snapshot_channel, Ack, LocalPlanStore, MemoryLocalStore,
    NoopLocalStore, Outcome, SetWriteBuffer, Snapshot, Subscription, SyncCoordinator, SyncError,
    SyncSettings,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
