//! Field values stored in documents.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Field map of a single document.
pub type Fields = BTreeMap<String, FieldValue>;

/// A scalar value stored under a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(DateTime<Utc>),
    /// Placeholder replaced by the store's clock when the write is applied.
    ServerTimestamp,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Replaces a [`FieldValue::ServerTimestamp`] with `now`.
    pub fn resolve(self, now: DateTime<Utc>) -> FieldValue {
        match self {
            FieldValue::ServerTimestamp => FieldValue::Timestamp(now),
            other => other,
        }
    }

    /// Total order used when a query sorts by this field:
    /// null < bool < number < timestamp < string.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
            (FieldValue::Str(a), FieldValue::Str(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) | FieldValue::Float(_) => 2,
            FieldValue::Timestamp(_) | FieldValue::ServerTimestamp => 3,
            FieldValue::Str(_) => 4,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_conversion() {
        assert_eq!(FieldValue::from(Some(3)), FieldValue::Int(3));
        assert_eq!(FieldValue::from(None::<i32>), FieldValue::Null);
    }

    #[test]
    fn test_sort_order_across_types() {
        let mut values = vec![
            FieldValue::from("b"),
            FieldValue::Int(2),
            FieldValue::Null,
            FieldValue::Float(1.5),
            FieldValue::Bool(true),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![
                FieldValue::Null,
                FieldValue::Bool(true),
                FieldValue::Float(1.5),
                FieldValue::Int(2),
                FieldValue::from("b"),
            ]
        );
    }

    #[test]
    fn test_resolve_server_timestamp() {
        let now = Utc::now();
        assert_eq!(
            FieldValue::ServerTimestamp.resolve(now),
            FieldValue::Timestamp(now)
        );
        assert_eq!(FieldValue::Int(1).resolve(now), FieldValue::Int(1));
    }
}
