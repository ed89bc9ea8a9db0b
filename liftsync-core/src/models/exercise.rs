use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::{DecodeError, Document, FieldReader, FieldValue, Fields, Record};

/// An exercise attached to a training plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub muscle_group: String,
    pub description: String,
    /// Position within the plan. `None` only before the first persist.
    pub order: Option<i32>,
}

impl Exercise {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            muscle_group: String::new(),
            description: String::new(),
            order: None,
        }
    }

    /// Exercise built from a picker entry, not yet persisted.
    pub fn from_definition(definition: &ExerciseDefinition) -> Self {
        Self {
            id: String::new(),
            name: definition.name.clone(),
            muscle_group: definition.muscle_group.clone(),
            description: definition.description.clone(),
            order: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_muscle_group(mut self, muscle_group: impl Into<String>) -> Self {
        self.muscle_group = muscle_group.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

impl Record for Exercise {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Fields {
        let mut fields =
            definition_fields(&self.id, &self.name, &self.muscle_group, &self.description);
        fields.insert("order".to_string(), FieldValue::from(self.order));
        fields
    }

    fn from_document(doc: &Document) -> Result<Self, DecodeError> {
        let r = FieldReader::new(doc);
        Ok(Self {
            id: doc.id.clone(),
            name: r.string("exerciseName")?,
            muscle_group: r.string("muscleGroup")?,
            description: r.string("description")?,
            order: r.opt_i32("order")?,
        })
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            Some(order) => write!(f, "{}. {}", order + 1, self.name)?,
            None => write!(f, "-. {}", self.name)?,
        }
        if !self.muscle_group.is_empty() {
            write!(f, " ({})", self.muscle_group)?;
        }
        Ok(())
    }
}

/// User-authored exercise definition under `users/{uid}/customExercises`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomExercise {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub muscle_group: String,
    #[serde(default)]
    pub description: String,
}

/// Shared read-only catalog entry under `templateExercises`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub muscle_group: String,
    #[serde(default)]
    pub description: String,
}

macro_rules! definition_record {
    ($ty:ident) => {
        impl $ty {
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    id: String::new(),
                    name: name.into(),
                    muscle_group: String::new(),
                    description: String::new(),
                }
            }

            pub fn with_id(mut self, id: impl Into<String>) -> Self {
                self.id = id.into();
                self
            }

            pub fn with_muscle_group(mut self, muscle_group: impl Into<String>) -> Self {
                self.muscle_group = muscle_group.into();
                self
            }

            pub fn with_description(mut self, description: impl Into<String>) -> Self {
                self.description = description.into();
                self
            }
        }

        impl Record for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn to_fields(&self) -> Fields {
                definition_fields(&self.id, &self.name, &self.muscle_group, &self.description)
            }

            fn from_document(doc: &Document) -> Result<Self, DecodeError> {
                let r = FieldReader::new(doc);
                Ok(Self {
                    id: doc.id.clone(),
                    name: r.string("exerciseName")?,
                    muscle_group: r.string("muscleGroup")?,
                    description: r.string("description")?,
                })
            }
        }
    };
}

definition_record!(CustomExercise);
definition_record!(TemplateExercise);

fn definition_fields(id: &str, name: &str, muscle_group: &str, description: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("id".to_string(), FieldValue::from(id));
    fields.insert("exerciseName".to_string(), FieldValue::from(name));
    fields.insert("muscleGroup".to_string(), FieldValue::from(muscle_group));
    fields.insert("description".to_string(), FieldValue::from(description));
    fields
}

/// Where a picker entry came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionSource {
    Custom,
    Catalog,
}

impl fmt::Display for DefinitionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionSource::Custom => write!(f, "custom"),
            DefinitionSource::Catalog => write!(f, "catalog"),
        }
    }
}

/// Custom and catalog exercises seen through one shape, as the picker lists them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseDefinition {
    pub id: String,
    pub name: String,
    pub muscle_group: String,
    pub description: String,
    pub source: DefinitionSource,
}

impl From<CustomExercise> for ExerciseDefinition {
    fn from(e: CustomExercise) -> Self {
        Self {
            id: e.id,
            name: e.name,
            muscle_group: e.muscle_group,
            description: e.description,
            source: DefinitionSource::Custom,
        }
    }
}

impl From<TemplateExercise> for ExerciseDefinition {
    fn from(e: TemplateExercise) -> Self {
        Self {
            id: e.id,
            name: e.name,
            muscle_group: e.muscle_group,
            description: e.description,
            source: DefinitionSource::Catalog,
        }
    }
}
