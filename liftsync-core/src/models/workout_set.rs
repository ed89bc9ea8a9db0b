use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::{DecodeError, Document, FieldReader, FieldValue, Fields, Record};

/// One performed set of an exercise. `set_number` is 1-based and dense
/// within its exercise at rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSet {
    pub id: String,
    pub set_number: i32,
    pub reps: i32,
    pub weight: f64,
    pub performed_at: Option<DateTime<Utc>>,
}

impl WorkoutSet {
    pub fn new(set_number: i32, reps: i32, weight: f64) -> Self {
        Self {
            id: String::new(),
            set_number,
            reps,
            weight,
            performed_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl Record for WorkoutSet {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), FieldValue::from(self.id.as_str()));
        fields.insert("setNumber".to_string(), FieldValue::from(self.set_number));
        fields.insert("reps".to_string(), FieldValue::from(self.reps));
        fields.insert("weight".to_string(), FieldValue::from(self.weight));
        fields.insert(
            "performedAt".to_string(),
            self.performed_at
                .map(FieldValue::Timestamp)
                .unwrap_or(FieldValue::ServerTimestamp),
        );
        fields
    }

    fn from_document(doc: &Document) -> Result<Self, DecodeError> {
        let r = FieldReader::new(doc);
        Ok(Self {
            id: doc.id.clone(),
            set_number: r.opt_i32("setNumber")?.unwrap_or_default(),
            reps: r.opt_i32("reps")?.unwrap_or_default(),
            weight: r.opt_f64("weight")?.unwrap_or_default(),
            performed_at: r.opt_timestamp("performedAt")?,
        })
    }
}

impl fmt::Display for WorkoutSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Set {}: {} x {} kg", self.set_number, self.reps, self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unperformed_set_requests_server_timestamp() {
        let set = WorkoutSet::new(1, 8, 60.0).with_id("s1");
        assert_eq!(set.to_fields()["performedAt"], FieldValue::ServerTimestamp);
    }

    #[test]
    fn test_missing_numbers_default_to_zero() {
        let doc = Document {
            id: "s1".to_string(),
            fields: Fields::new(),
        };
        let set = WorkoutSet::from_document(&doc).unwrap();
        assert_eq!(set.set_number, 0);
        assert_eq!(set.weight, 0.0);
        assert!(set.performed_at.is_none());
    }

    #[test]
    fn test_set_display() {
        let set = WorkoutSet::new(2, 10, 42.5);
        assert_eq!(set.to_string(), "Set 2: 10 x 42.5 kg");
    }
}
