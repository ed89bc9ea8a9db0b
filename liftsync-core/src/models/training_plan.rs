use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::store::{DecodeError, Document, FieldReader, FieldValue, Fields, Record};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingPlan {
    pub id: String,
    pub name: String,
    /// Free-text muscle group tag, e.g. "Legs, Glutes".
    pub muscle_groups: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl TrainingPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            muscle_groups: String::new(),
            description: String::new(),
            created_at: Some(Utc::now()),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_muscle_groups(mut self, muscle_groups: impl Into<String>) -> Self {
        self.muscle_groups = muscle_groups.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Record for TrainingPlan {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), FieldValue::from(self.id.as_str()));
        fields.insert("planName".to_string(), FieldValue::from(self.name.as_str()));
        fields.insert(
            "muscleGroups".to_string(),
            FieldValue::from(self.muscle_groups.as_str()),
        );
        fields.insert(
            "description".to_string(),
            FieldValue::from(self.description.as_str()),
        );
        fields.insert(
            "createdAt".to_string(),
            self.created_at
                .map(FieldValue::Timestamp)
                .unwrap_or(FieldValue::ServerTimestamp),
        );
        fields
    }

    fn from_document(doc: &Document) -> Result<Self, DecodeError> {
        let r = FieldReader::new(doc);
        Ok(Self {
            id: doc.id.clone(),
            name: r.string("planName")?,
            muscle_groups: r.string("muscleGroups")?,
            description: r.string("description")?,
            created_at: r.opt_timestamp("createdAt")?,
        })
    }
}

impl fmt::Display for TrainingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        if !self.muscle_groups.is_empty() {
            writeln!(f, "Muscle groups: {}", self.muscle_groups)?;
        }
        if !self.description.is_empty() {
            writeln!(f, "\n{}", self.description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_builder() {
        let plan = TrainingPlan::new("Strength")
            .with_muscle_groups("Full Body")
            .with_description("3-day split");
        assert_eq!(plan.name, "Strength");
        assert_eq!(plan.muscle_groups, "Full Body");
        assert!(Uuid::parse_str(&plan.id).is_ok());
        assert!(plan.created_at.is_some());
    }

    #[test]
    fn test_plan_document_roundtrip() {
        let plan = TrainingPlan::new("Hypertrophy").with_id("p1");
        let doc = Document {
            id: plan.id.clone(),
            fields: plan.to_fields(),
        };
        assert_eq!(TrainingPlan::from_document(&doc).unwrap(), plan);
    }

    #[test]
    fn test_plan_display() {
        let plan = TrainingPlan::new("Push Day").with_muscle_groups("Chest");
        let output = format!("{}", plan);
        assert!(output.contains("Push Day"));
        assert!(output.contains("Muscle groups: Chest"));
    }
}
