//! Defines `CellValue`, the scalar stored in one column of a flattened row.

use chrono::{DateTime, NaiveDateTime};
use ordered_float::OrderedFloat;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single cell of a [`crate::FlatRow`].
///
/// Flattening only ever produces scalars (lists of scalars are joined into
/// [`CellValue::Text`]), but rows handed to the sink by other callers may carry
/// list cells. Those are kept as-is and written as JSON text.
///
/// Floats compare and hash by their total ordering (via `OrderedFloat`), so a
/// `CellValue` can be used as part of a de-duplication key.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// UTC-naive timestamp with seconds resolution.
    Timestamp(NaiveDateTime),
    List(Vec<CellValue>),
}

impl CellValue {
    /// Converts a JSON scalar into a cell. Arrays and objects are the walker's job
    /// (see [`crate::flatten_object`]); if one shows up here it is kept as JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => n.as_f64().map_or(CellValue::Null, CellValue::Float),
            },
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// True for `Null` and for floating point NaN, the two "missing" encodings.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Maps missing scalars to a true `Null`; everything else, lists included, passes through.
    pub fn sanitized(&self) -> CellValue {
        if self.is_missing() {
            CellValue::Null
        } else {
            self.clone()
        }
    }

    /// Interprets the cell as Unix epoch seconds and converts it to a timestamp.
    ///
    /// Returns `None` when the cell is not an integral number or lies outside the
    /// range chrono can represent. `Null` is handled by the caller.
    pub fn epoch_to_timestamp(&self) -> Option<NaiveDateTime> {
        let seconds = match self {
            CellValue::Int(i) => *i,
            CellValue::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i64,
            CellValue::Timestamp(ts) => return Some(*ts), // already rendered
            _ => return None,
        };
        epoch_seconds_to_naive(seconds)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// `epoch_seconds` seconds after 1970-01-01T00:00:00, as a UTC-naive timestamp.
pub fn epoch_seconds_to_naive(epoch_seconds: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(epoch_seconds, 0).map(|dt| dt.naive_utc())
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Timestamp(a), CellValue::Timestamp(b)) => a == b,
            (CellValue::List(a), CellValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Null => {}
            CellValue::Bool(b) => b.hash(state),
            CellValue::Int(i) => i.hash(state),
            CellValue::Float(f) => OrderedFloat(*f).hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Timestamp(ts) => ts.hash(state),
            CellValue::List(items) => items.hash(state),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(x) => write!(f, "{x}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            CellValue::List(items) => {
                let json = serde_json::to_string(items).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Timestamp(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Int(i),
            ValueRef::Real(f) => CellValue::Float(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                CellValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            CellValue::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Float(f) if f.is_nan() => ToSqlOutput::Owned(Value::Null),
            CellValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Timestamp(ts) => return ts.to_sql(),
            CellValue::List(items) => {
                let json = serde_json::to_string(items)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(Value::Text(json))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn json_numbers_keep_integer_and_float_kinds() {
        assert_eq!(CellValue::from_json(&json!(1735689600)), CellValue::Int(1735689600));
        assert_eq!(CellValue::from_json(&json!(52.1)), CellValue::Float(52.1));
        assert_eq!(CellValue::from_json(&json!(null)), CellValue::Null);
        assert_eq!(CellValue::from_json(&json!("Clear")), CellValue::from("Clear"));
    }

    #[test]
    fn epoch_converts_to_naive_utc() {
        let ts = CellValue::Int(1735689600).epoch_to_timestamp().unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(ts, expected);

        assert_eq!(
            CellValue::Int(0).epoch_to_timestamp(),
            Some(DateTime::UNIX_EPOCH.naive_utc())
        );
        assert_eq!(CellValue::Float(86400.0).epoch_to_timestamp().unwrap().timestamp(), 86400);
        assert!(CellValue::Float(1.5).epoch_to_timestamp().is_none());
        assert!(CellValue::from("soon").epoch_to_timestamp().is_none());
    }

    #[test]
    fn nan_is_missing_and_sanitizes_to_null() {
        assert!(CellValue::Float(f64::NAN).is_missing());
        assert_eq!(CellValue::Float(f64::NAN).sanitized(), CellValue::Null);

        let list = CellValue::List(vec![CellValue::from("rain"), CellValue::Null]);
        assert_eq!(list.sanitized(), list);
        assert_eq!(CellValue::Int(3).sanitized(), CellValue::Int(3));
    }

    #[test]
    fn floats_hash_consistently_for_dedup() {
        let mut seen = HashSet::new();
        assert!(seen.insert(CellValue::Float(1.0)));
        assert!(!seen.insert(CellValue::Float(1.0)));
        assert!(seen.insert(CellValue::Float(f64::NAN)));
        assert!(!seen.insert(CellValue::Float(f64::NAN)));
        assert!(seen.insert(CellValue::Int(1)));
    }

    #[test]
    fn display_renders_timestamps_and_lists() {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap();
        assert_eq!(CellValue::Timestamp(ts).to_string(), "2025-01-02 06:30:00");
        let list = CellValue::List(vec![CellValue::from("a"), CellValue::Int(2)]);
        assert_eq!(list.to_string(), r#"["a",2]"#);
        assert_eq!(CellValue::Null.to_string(), "");
    }
}
