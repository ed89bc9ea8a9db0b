use std::fs;
use std::path::{Path, PathBuf};

use liftsync_core::{LocalPlanStore, StoreError, TrainingPlan};
use tracing::warn;

pub const LOCAL_PLANS_FILENAME: &str = "local_plans.json";

/// Plans created without a signed-in user, kept as a JSON file in the data
/// directory.
pub struct FileLocalStore {
    path: PathBuf,
}

impl FileLocalStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(LOCAL_PLANS_FILENAME),
        }
    }

    fn failure(&self, action: &str, e: impl std::fmt::Display) -> StoreError {
        warn!("Failed to {} {}: {}", action, self.path.display(), e);
        StoreError::Persistence(format!("{} {}: {}", action, self.path.display(), e))
    }

    fn read(&self) -> Result<Vec<TrainingPlan>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| self.failure("read", e))?;
        serde_json::from_str(&contents).map_err(|e| self.failure("parse", e))
    }

    fn write(&self, plans: &[TrainingPlan]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.failure("create directory for", e))?;
        }
        let json = serde_json::to_string_pretty(plans).map_err(|e| self.failure("encode", e))?;
        fs::write(&self.path, json).map_err(|e| self.failure("write", e))
    }

    fn modify(&self, change: impl FnOnce(&mut Vec<TrainingPlan>)) -> Result<(), StoreError> {
        let mut plans = self.read()?;
        change(&mut plans);
        self.write(&plans)
    }
}

impl LocalPlanStore for FileLocalStore {
    fn save_plan(&self, plan: &TrainingPlan) -> Result<(), StoreError> {
        self.modify(|plans| match plans.iter_mut().find(|p| p.id == plan.id) {
            Some(existing) => *existing = plan.clone(),
            None => plans.push(plan.clone()),
        })
    }

    fn delete_plan(&self, plan_id: &str) -> Result<(), StoreError> {
        self.modify(|plans| plans.retain(|p| p.id != plan_id))
    }

    fn plans(&self) -> Result<Vec<TrainingPlan>, StoreError> {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_has_no_plans() {
        let temp_dir = tempdir().unwrap();
        let store = FileLocalStore::new(temp_dir.path());
        assert!(store.plans().unwrap().is_empty());
    }

    #[test]
    fn test_plans_survive_reopen() {
        let temp_dir = tempdir().unwrap();
        let store = FileLocalStore::new(temp_dir.path());
        store.save_plan(&TrainingPlan::new("Push").with_id("p1")).unwrap();
        store.save_plan(&TrainingPlan::new("Pull").with_id("p2")).unwrap();
        store.save_plan(&TrainingPlan::new("Push Day").with_id("p1")).unwrap();

        let reopened = FileLocalStore::new(temp_dir.path());
        let names: Vec<String> = reopened
            .plans()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Push Day", "Pull"]);

        reopened.delete_plan("p1").unwrap();
        assert_eq!(store.plans().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_file_fails_and_is_kept() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join(LOCAL_PLANS_FILENAME);
        fs::write(&path, "not json").unwrap();
        let store = FileLocalStore::new(temp_dir.path());

        assert!(matches!(store.plans(), Err(StoreError::Persistence(_))));
        assert!(store.save_plan(&TrainingPlan::new("Legs")).is_err());
        assert!(store.delete_plan("p1").is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
    }
}
