//! Hierarchical collection and document paths.
//!
//! Paths mirror the store layout:
//! - `users/{userId}`
//! - `users/{userId}/trainingPlans/{planId}`
//! - `users/{userId}/trainingPlans/{planId}/exercises/{exerciseId}`
//! - `users/{userId}/trainingPlans/{planId}/exercises/{exerciseId}/sets/{setId}`
//! - `users/{userId}/customExercises/{exerciseId}`
//! - `templateExercises/{exerciseId}`

use std::fmt;

/// Path of a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn users() -> Self {
        Self("users".to_string())
    }

    pub fn training_plans(user_id: &str) -> Self {
        Self(format!("users/{}/trainingPlans", user_id))
    }

    pub fn exercises(user_id: &str, plan_id: &str) -> Self {
        Self(format!("users/{}/trainingPlans/{}/exercises", user_id, plan_id))
    }

    pub fn sets(user_id: &str, plan_id: &str, exercise_id: &str) -> Self {
        Self(format!(
            "users/{}/trainingPlans/{}/exercises/{}/sets",
            user_id, plan_id, exercise_id
        ))
    }

    pub fn custom_exercises(user_id: &str) -> Self {
        Self(format!("users/{}/customExercises", user_id))
    }

    pub fn template_exercises() -> Self {
        Self("templateExercises".to_string())
    }

    /// Path of the document `id` inside this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl DocumentPath {
    pub fn user(user_id: &str) -> Self {
        CollectionPath::users().doc(user_id)
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_paths() {
        assert_eq!(
            CollectionPath::training_plans("u1").as_str(),
            "users/u1/trainingPlans"
        );
        assert_eq!(
            CollectionPath::exercises("u1", "p1").as_str(),
            "users/u1/trainingPlans/p1/exercises"
        );
        assert_eq!(
            CollectionPath::sets("u1", "p1", "e1").doc("s1").to_string(),
            "users/u1/trainingPlans/p1/exercises/e1/sets/s1"
        );
    }

    #[test]
    fn test_top_level_paths() {
        assert_eq!(
            CollectionPath::template_exercises().as_str(),
            "templateExercises"
        );
        assert_eq!(
            CollectionPath::custom_exercises("u1").as_str(),
            "users/u1/customExercises"
        );
        assert_eq!(DocumentPath::user("u1").to_string(), "users/u1");
    }

    #[test]
    fn test_document_path_parts() {
        let path = CollectionPath::exercises("u1", "p1").doc("e9");
        assert_eq!(path.id(), "e9");
        assert_eq!(path.collection(), &CollectionPath::exercises("u1", "p1"));
    }
}
