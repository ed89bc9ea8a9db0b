//! Sync coordinator: turns UI mutation intents into store writes and fans
//! out live query results.
//!
//! Every mutation races the store against a fallback timer. Whichever arm
//! answers first decides the outcome; the other finds the completion cell
//! already filled and is dropped. When the timer wins the write stays queued
//! in the store and its eventual result is only logged.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join, join_all, try_join_all};
use tracing::{debug, info, warn};

use super::completion::{Ack, OnceSignal, Outcome};
use super::local::{LocalPlanStore, NoopLocalStore};
use super::subscription::{Snapshot, Subscription};
use super::SyncError;
use crate::identity::IdentityProvider;
use crate::models::{
    CustomExercise, Exercise, ExerciseDefinition, TemplateExercise, TrainingPlan, WorkoutSet,
};
use crate::ordering::renumber_after_delete;
use crate::store::{
    decode_snapshot, CollectionPath, DocumentPath, Fields, Query, Record, RemoteStore, StoreError,
};

/// Timing knobs of the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// How long a mutation waits for the store before reporting queued success.
    pub fallback_delay: Duration,
    /// Pause after a drag ends before remote snapshots are mirrored again.
    pub settle_delay: Duration,
    /// Quiet time before buffered set edits are written.
    pub set_write_debounce: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            fallback_delay: Duration::from_millis(1000),
            settle_delay: Duration::from_millis(100),
            set_write_debounce: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct SyncCoordinator {
    store: Arc<dyn RemoteStore>,
    identity: Arc<dyn IdentityProvider>,
    local: Arc<dyn LocalPlanStore>,
    settings: SyncSettings,
}

impl SyncCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            local: Arc::new(NoopLocalStore),
            settings: SyncSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Plan storage used while no user is signed in.
    pub fn with_local_store(mut self, local: Arc<dyn LocalPlanStore>) -> Self {
        self.local = local;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.identity.current_user_id()
    }

    // ==================== Training plans ====================

    /// Creates or replaces a plan. Without a signed-in user the plan goes to
    /// the local stand-in store.
    pub async fn save_plan(&self, plan: &TrainingPlan) -> Outcome {
        require_id(&plan.id, "Plan ID is empty.")?;
        let Some(user_id) = self.current_user_id() else {
            self.local.save_plan(plan)?;
            return Ok(Ack::confirmed(Some(plan.id.clone())));
        };

        let path = CollectionPath::training_plans(&user_id).doc(plan.id.as_str());
        self.race("save_plan", Some(plan.id.clone()), self.write(path, plan.to_fields()))
            .await
    }

    pub async fn update_plan(&self, plan: &TrainingPlan) -> Outcome {
        require_id(&plan.id, "Plan ID is empty.")?;
        let Some(user_id) = self.current_user_id() else {
            self.local.save_plan(plan)?;
            return Ok(Ack::confirmed(None));
        };

        let path = CollectionPath::training_plans(&user_id).doc(plan.id.as_str());
        self.race("update_plan", None, self.write(path, plan.to_fields()))
            .await
    }

    /// Deletes a plan together with its exercises and their sets.
    pub async fn delete_plan(&self, plan_id: &str) -> Outcome {
        require_id(plan_id, "Plan ID is empty.")?;
        let Some(user_id) = self.current_user_id() else {
            self.local.delete_plan(plan_id)?;
            return Ok(Ack::confirmed(None));
        };

        let store = Arc::clone(&self.store);
        let plan_id = plan_id.to_string();
        self.race("delete_plan", None, async move {
            let exercises = CollectionPath::exercises(&user_id, &plan_id);
            let docs = store.get(&Query::new(exercises)).await?;
            let plan = CollectionPath::training_plans(&user_id).doc(plan_id.as_str());
            // Issued together so an offline store applies the whole tree at once.
            let (trees, removed) = join(
                try_join_all(docs.iter().map(|exercise| {
                    delete_exercise_tree(store.as_ref(), &user_id, &plan_id, &exercise.id)
                })),
                store.delete(&plan),
            )
            .await;
            trees?;
            removed
        })
        .await
    }

    /// Live plan list. Without a signed-in user the local stand-in's plans
    /// are delivered once, or a failed snapshot if they cannot be read.
    pub fn subscribe_plans<H>(&self, handler: H) -> Subscription
    where
        H: FnMut(Snapshot<TrainingPlan>) + Send + 'static,
    {
        match self.current_user_id() {
            Some(user_id) => self.subscribe(
                Query::new(CollectionPath::training_plans(&user_id)).order_by("createdAt"),
                handler,
            ),
            None => match self.local.plans() {
                Ok(plans) => Subscription::immediate(plans, handler),
                Err(e) => {
                    warn!("Failed to read local plans: {}", e);
                    Subscription::failed(SyncError::from(e), handler)
                }
            },
        }
    }

    // ==================== Exercise definitions ====================

    /// Creates a user-authored exercise definition; the id is client generated
    /// when the definition has none.
    pub async fn create_custom_exercise(&self, exercise: &CustomExercise) -> Outcome {
        let user_id = self.require_user()?;
        let id = self.id_for(&exercise.id);
        let exercise = exercise.clone().with_id(id.as_str());

        let path = CollectionPath::custom_exercises(&user_id).doc(id.as_str());
        self.race(
            "create_custom_exercise",
            Some(id),
            self.write(path, exercise.to_fields()),
        )
        .await
    }

    pub fn subscribe_custom_exercises<H>(&self, handler: H) -> Subscription
    where
        H: FnMut(Snapshot<CustomExercise>) + Send + 'static,
    {
        match self.current_user_id() {
            Some(user_id) => {
                self.subscribe(Query::new(CollectionPath::custom_exercises(&user_id)), handler)
            }
            None => Subscription::immediate(Vec::new(), handler),
        }
    }

    pub fn subscribe_template_exercises<H>(&self, handler: H) -> Subscription
    where
        H: FnMut(Snapshot<TemplateExercise>) + Send + 'static,
    {
        self.subscribe(Query::new(CollectionPath::template_exercises()), handler)
    }

    /// Adds an entry to the shared catalog.
    pub async fn seed_template_exercise(&self, exercise: &TemplateExercise) -> Outcome {
        let id = self.id_for(&exercise.id);
        let exercise = exercise.clone().with_id(id.as_str());

        let path = CollectionPath::template_exercises().doc(id.as_str());
        self.race(
            "seed_template_exercise",
            Some(id),
            self.write(path, exercise.to_fields()),
        )
        .await
    }

    // ==================== Plan exercises ====================

    pub async fn create_exercise(&self, plan_id: &str, exercise: &Exercise) -> Outcome {
        require_id(plan_id, "Plan ID is empty.")?;
        let user_id = self.require_user()?;
        let id = self.id_for(&exercise.id);
        let exercise = exercise.clone().with_id(id.as_str());

        let path = CollectionPath::exercises(&user_id, plan_id).doc(id.as_str());
        self.race(
            "create_exercise",
            Some(id),
            self.write(path, exercise.to_fields()),
        )
        .await
    }

    /// One-shot read of a plan's exercises in display order.
    pub async fn get_exercises(&self, plan_id: &str) -> Result<Vec<Exercise>, SyncError> {
        require_id(plan_id, "Plan ID is empty.")?;
        let user_id = self.require_user()?;
        let docs = self
            .store
            .get(&Query::new(CollectionPath::exercises(&user_id, plan_id)).order_by("order"))
            .await?;
        Ok(decode_snapshot(&docs))
    }

    pub async fn update_exercise(&self, plan_id: &str, exercise: &Exercise) -> Outcome {
        require_id(&exercise.id, "Exercise ID is empty.")?;
        require_id(plan_id, "Plan ID is empty.")?;
        let user_id = self.require_user()?;

        let path = CollectionPath::exercises(&user_id, plan_id).doc(exercise.id.as_str());
        self.race("update_exercise", None, self.write(path, exercise.to_fields()))
            .await
    }

    /// Deletes an exercise and its sets.
    pub async fn delete_exercise(&self, plan_id: &str, exercise_id: &str) -> Outcome {
        require_id(exercise_id, "Exercise ID is empty.")?;
        require_id(plan_id, "Plan ID is empty.")?;
        let user_id = self.require_user()?;

        let store = Arc::clone(&self.store);
        let plan_id = plan_id.to_string();
        let exercise_id = exercise_id.to_string();
        self.race("delete_exercise", None, async move {
            delete_exercise_tree(store.as_ref(), &user_id, &plan_id, &exercise_id).await
        })
        .await
    }

    /// Live exercise list of a plan, sorted by `order`.
    pub fn subscribe_exercises<H>(&self, plan_id: &str, handler: H) -> Subscription
    where
        H: FnMut(Snapshot<Exercise>) + Send + 'static,
    {
        match self.current_user_id() {
            Some(user_id) => self.subscribe(
                Query::new(CollectionPath::exercises(&user_id, plan_id)).order_by("order"),
                handler,
            ),
            None => Subscription::immediate(Vec::new(), handler),
        }
    }

    /// Attaches picker entries to a plan, appended after the existing
    /// exercises in the given order.
    pub async fn add_definitions_to_plan(
        &self,
        plan_id: &str,
        definitions: &[ExerciseDefinition],
    ) -> Result<Vec<Outcome>, SyncError> {
        let existing = self.get_exercises(plan_id).await?.len() as i32;
        let exercises: Vec<Exercise> = definitions
            .iter()
            .enumerate()
            .map(|(i, d)| Exercise::from_definition(d).with_order(existing + i as i32))
            .collect();

        Ok(join_all(exercises.iter().map(|e| self.create_exercise(plan_id, e))).await)
    }

    /// Persists the position changes produced by a drag. Failures are logged
    /// and left for the next snapshot to reconcile; nothing is rolled back.
    pub async fn commit_order(&self, plan_id: &str, changed: &[Exercise]) -> Vec<Outcome> {
        let outcomes = join_all(changed.iter().map(|e| self.update_exercise(plan_id, e))).await;
        for (exercise, outcome) in changed.iter().zip(&outcomes) {
            if let Err(e) = outcome {
                warn!("Failed to store order of exercise {}: {}", exercise.id, e);
            }
        }
        outcomes
    }

    // ==================== Sets ====================

    /// Records a set; `performedAt` is stamped by the store.
    pub async fn create_set(&self, plan_id: &str, exercise_id: &str, set: &WorkoutSet) -> Outcome {
        require_id(plan_id, "Plan ID is empty.")?;
        require_id(exercise_id, "Exercise ID is empty.")?;
        let user_id = self.require_user()?;
        let id = self.id_for(&set.id);
        let mut set = set.clone().with_id(id.as_str());
        set.performed_at = None;

        let path = CollectionPath::sets(&user_id, plan_id, exercise_id).doc(id.as_str());
        self.race("create_set", Some(id), self.write(path, set.to_fields()))
            .await
    }

    pub async fn get_sets(
        &self,
        plan_id: &str,
        exercise_id: &str,
    ) -> Result<Vec<WorkoutSet>, SyncError> {
        require_id(plan_id, "Plan ID is empty.")?;
        require_id(exercise_id, "Exercise ID is empty.")?;
        let user_id = self.require_user()?;
        let query = Query::new(CollectionPath::sets(&user_id, plan_id, exercise_id))
            .order_by("setNumber");
        Ok(decode_snapshot(&self.store.get(&query).await?))
    }

    pub async fn update_set(&self, plan_id: &str, exercise_id: &str, set: &WorkoutSet) -> Outcome {
        require_id(&set.id, "Set ID is empty.")?;
        require_id(plan_id, "Plan ID is empty.")?;
        require_id(exercise_id, "Exercise ID is empty.")?;
        let user_id = self.require_user()?;

        let path = CollectionPath::sets(&user_id, plan_id, exercise_id).doc(set.id.as_str());
        self.race("update_set", None, self.write(path, set.to_fields()))
            .await
    }

    pub async fn delete_set(&self, plan_id: &str, exercise_id: &str, set_id: &str) -> Outcome {
        require_id(set_id, "Set ID is empty.")?;
        require_id(plan_id, "Plan ID is empty.")?;
        require_id(exercise_id, "Exercise ID is empty.")?;
        let user_id = self.require_user()?;

        let path = CollectionPath::sets(&user_id, plan_id, exercise_id).doc(set_id);
        let store = Arc::clone(&self.store);
        self.race("delete_set", None, async move { store.delete(&path).await })
            .await
    }

    /// Live set list of an exercise, sorted by `setNumber`.
    pub fn subscribe_sets<H>(&self, plan_id: &str, exercise_id: &str, handler: H) -> Subscription
    where
        H: FnMut(Snapshot<WorkoutSet>) + Send + 'static,
    {
        match self.current_user_id() {
            Some(user_id) => self.subscribe(
                Query::new(CollectionPath::sets(&user_id, plan_id, exercise_id))
                    .order_by("setNumber"),
                handler,
            ),
            None => Subscription::immediate(Vec::new(), handler),
        }
    }

    /// Deletes one set of `sets` and renumbers the ones after it, writing
    /// only the sets whose number changed. Returns the remaining sets.
    pub async fn delete_set_and_renumber(
        &self,
        plan_id: &str,
        exercise_id: &str,
        sets: &[WorkoutSet],
        set_id: &str,
    ) -> Result<Vec<WorkoutSet>, SyncError> {
        self.delete_set(plan_id, exercise_id, set_id).await?;

        let (remaining, changed) = renumber_after_delete(sets, set_id);
        let outcomes =
            join_all(changed.iter().map(|s| self.update_set(plan_id, exercise_id, s))).await;
        for (set, outcome) in changed.iter().zip(outcomes) {
            if let Err(e) = outcome {
                warn!("Failed to renumber set {}: {}", set.id, e);
            }
        }
        Ok(remaining)
    }

    // ==================== Internals ====================

    fn require_user(&self) -> Result<String, SyncError> {
        self.current_user_id()
            .ok_or_else(|| SyncError::Validation("No signed-in user.".to_string()))
    }

    fn id_for(&self, id: &str) -> String {
        if id.trim().is_empty() {
            self.store.new_document_id()
        } else {
            id.to_string()
        }
    }

    fn write(
        &self,
        path: DocumentPath,
        fields: Fields,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'static {
        let store = Arc::clone(&self.store);
        async move { store.set(&path, fields).await }
    }

    fn subscribe<T, H>(&self, query: Query, handler: H) -> Subscription
    where
        T: Record + Send + 'static,
        H: FnMut(Snapshot<T>) + Send + 'static,
    {
        let label = query.collection.to_string();
        Subscription::spawn(label, self.store.subscribe(query), handler)
    }

    /// Races `write` against the fallback timer and returns the first answer.
    async fn race<W>(&self, operation: &'static str, id: Option<String>, write: W) -> Outcome
    where
        W: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        debug!("{}: issuing write", operation);
        let (signal, answer) = OnceSignal::new();

        let store_arm = signal.clone();
        let store_id = id.clone();
        tokio::spawn(async move {
            let outcome = match write.await {
                Ok(()) => Ok(Ack::confirmed(store_id)),
                Err(e) => {
                    warn!("{}: store rejected write: {}", operation, e);
                    Err(SyncError::from(e))
                }
            };
            if !store_arm.fire(outcome) {
                debug!("{}: store answered after fallback, result discarded", operation);
            }
        });

        let delay = self.settings.fallback_delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if signal.fire(Ok(Ack::queued(id))) {
                info!("{}: no answer after {:?}, treating as queued offline", operation, delay);
            }
        });

        let outcome = answer
            .await
            .unwrap_or_else(|_| Err(SyncError::Store(format!("{} was abandoned", operation))));
        timer.abort();
        outcome
    }
}

fn require_id(id: &str, message: &str) -> Result<(), SyncError> {
    if id.trim().is_empty() {
        return Err(SyncError::Validation(message.to_string()));
    }
    Ok(())
}

async fn delete_exercise_tree(
    store: &dyn RemoteStore,
    user_id: &str,
    plan_id: &str,
    exercise_id: &str,
) -> Result<(), StoreError> {
    let sets = CollectionPath::sets(user_id, plan_id, exercise_id);
    let docs = store.get(&Query::new(sets.clone())).await?;
    let exercise = CollectionPath::exercises(user_id, plan_id).doc(exercise_id);
    let (children, removed) = join(
        try_join_all(docs.into_iter().map(|set| {
            let path = sets.doc(set.id);
            async move { store.delete(&path).await }
        })),
        store.delete(&exercise),
    )
    .await;
    children?;
    removed
}
