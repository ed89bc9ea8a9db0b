//! Mapping between models and store documents.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use super::{Document, FieldValue, Fields};

/// Errors raised while reading a model out of a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Field '{field}' of document {id} has the wrong type (expected {expected})")]
    WrongType {
        id: String,
        field: String,
        expected: &'static str,
    },
}

/// A model that is persisted as a single store document.
pub trait Record: Sized {
    fn id(&self) -> &str;

    fn to_fields(&self) -> Fields;

    fn from_document(doc: &Document) -> Result<Self, DecodeError>;
}

/// Decodes every document of a snapshot, dropping the ones that do not map.
pub fn decode_snapshot<T: Record>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match T::from_document(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping undecodable document: {}", e);
                None
            }
        })
        .collect()
}

/// Typed accessors over a document's fields.
///
/// Missing and null fields read as empty; a present field of another type is
/// a [`DecodeError`].
pub(crate) struct FieldReader<'a> {
    doc: &'a Document,
}

impl<'a> FieldReader<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    fn get(&self, key: &str) -> Option<&'a FieldValue> {
        self.doc.fields.get(key).filter(|v| !v.is_null())
    }

    fn wrong_type(&self, key: &str, expected: &'static str) -> DecodeError {
        DecodeError::WrongType {
            id: self.doc.id.clone(),
            field: key.to_string(),
            expected,
        }
    }

    pub fn string(&self, key: &str) -> Result<String, DecodeError> {
        match self.get(key) {
            None => Ok(String::new()),
            Some(FieldValue::Str(s)) => Ok(s.clone()),
            Some(_) => Err(self.wrong_type(key, "string")),
        }
    }

    pub fn opt_i32(&self, key: &str) -> Result<Option<i32>, DecodeError> {
        match self.get(key) {
            None => Ok(None),
            Some(FieldValue::Int(i)) => Ok(Some(*i as i32)),
            Some(FieldValue::Float(f)) if f.fract() == 0.0 => Ok(Some(*f as i32)),
            Some(_) => Err(self.wrong_type(key, "integer")),
        }
    }

    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, DecodeError> {
        match self.get(key) {
            None => Ok(None),
            Some(FieldValue::Float(f)) => Ok(Some(*f)),
            Some(FieldValue::Int(i)) => Ok(Some(*i as f64)),
            Some(_) => Err(self.wrong_type(key, "number")),
        }
    }

    pub fn opt_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, DecodeError> {
        match self.get(key) {
            None | Some(FieldValue::ServerTimestamp) => Ok(None),
            Some(FieldValue::Timestamp(t)) => Ok(Some(*t)),
            Some(FieldValue::Str(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|_| self.wrong_type(key, "timestamp")),
            Some(_) => Err(self.wrong_type(key, "timestamp")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(fields: &[(&str, FieldValue)]) -> Document {
        Document {
            id: "d1".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_missing_fields_read_as_empty() {
        let d = doc(&[("name", FieldValue::Null)]);
        let reader = FieldReader::new(&d);
        assert_eq!(reader.string("name").unwrap(), "");
        assert_eq!(reader.opt_i32("order").unwrap(), None);
        assert_eq!(reader.opt_timestamp("createdAt").unwrap(), None);
    }

    #[test]
    fn test_numbers_widen() {
        let d = doc(&[("reps", FieldValue::Float(8.0)), ("weight", FieldValue::Int(60))]);
        let reader = FieldReader::new(&d);
        assert_eq!(reader.opt_i32("reps").unwrap(), Some(8));
        assert_eq!(reader.opt_f64("weight").unwrap(), Some(60.0));
    }

    #[test]
    fn test_wrong_type_is_error() {
        let d = doc(&[("order", FieldValue::from("first"))]);
        let err = FieldReader::new(&d).opt_i32("order").unwrap_err();
        assert!(err.to_string().contains("order"));
    }
}
