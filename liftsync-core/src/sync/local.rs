//! Stand-in plan storage used while no user is signed in.

use parking_lot::Mutex;
use tracing::debug;

use crate::models::TrainingPlan;
use crate::store::StoreError;

/// Plan storage for unauthenticated mode. Synchronous; implementations must
/// not block on the network.
pub trait LocalPlanStore: Send + Sync {
    fn save_plan(&self, plan: &TrainingPlan) -> Result<(), StoreError>;

    fn delete_plan(&self, plan_id: &str) -> Result<(), StoreError>;

    fn plans(&self) -> Result<Vec<TrainingPlan>, StoreError>;
}

/// Placeholder that accepts writes and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLocalStore;

impl LocalPlanStore for NoopLocalStore {
    fn save_plan(&self, plan: &TrainingPlan) -> Result<(), StoreError> {
        debug!("No local plan storage; dropping save of plan {}", plan.id);
        Ok(())
    }

    fn delete_plan(&self, plan_id: &str) -> Result<(), StoreError> {
        debug!("No local plan storage; dropping delete of plan {}", plan_id);
        Ok(())
    }

    fn plans(&self) -> Result<Vec<TrainingPlan>, StoreError> {
        Ok(Vec::new())
    }
}

/// Keeps plans in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    plans: Mutex<Vec<TrainingPlan>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalPlanStore for MemoryLocalStore {
    fn save_plan(&self, plan: &TrainingPlan) -> Result<(), StoreError> {
        let mut plans = self.plans.lock();
        match plans.iter_mut().find(|p| p.id == plan.id) {
            Some(existing) => *existing = plan.clone(),
            None => plans.push(plan.clone()),
        }
        Ok(())
    }

    fn delete_plan(&self, plan_id: &str) -> Result<(), StoreError> {
        self.plans.lock().retain(|p| p.id != plan_id);
        Ok(())
    }

    fn plans(&self) -> Result<Vec<TrainingPlan>, StoreError> {
        Ok(self.plans.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_keeps_nothing() {
        let store = NoopLocalStore;
        store.save_plan(&TrainingPlan::new("Legs")).unwrap();
        assert!(store.plans().unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_replaces_by_id() {
        let store = MemoryLocalStore::new();
        let plan = TrainingPlan::new("Legs").with_id("p1");
        store.save_plan(&plan).unwrap();
        store.save_plan(&plan.clone().with_description("heavy")).unwrap();
        let plans = store.plans().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].description, "heavy");

        store.delete_plan("p1").unwrap();
        assert!(store.plans().unwrap().is_empty());
    }
}
