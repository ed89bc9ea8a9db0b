use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{DecodeError, Document, FieldReader, FieldValue, Fields, Record};

/// Account record stored at `users/{id}`; root of every owned collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            created_at: None,
        }
    }
}

impl Record for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), FieldValue::from(self.id.as_str()));
        fields.insert("email".to_string(), FieldValue::from(self.email.as_str()));
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
            email: r.string("email")?,
            created_at: r.opt_timestamp("createdAt")?,
        })
    }
}
