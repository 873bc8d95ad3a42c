//! Dynamically typed column values.
//!
//! A [`Row`] maps field names to [`FieldValue`]s. Rows are used both for full
//! records and for subsets of them (primary key values, requested columns).
//! Iteration order of a row carries no meaning.

use std::cmp::Ordering;
use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record, or a subset of its columns, keyed by field name.
pub type Row = HashMap<String, FieldValue>;

/// Column type of a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Boolean column.
    Bool,
    /// 32-bit signed integer column.
    Int32,
    /// 64-bit signed integer column.
    Int64,
    /// 64-bit floating point column.
    Double,
    /// UTF-8 string column.
    String,
    /// Opaque byte column.
    Blob,
    /// UTC timestamp column.
    Timestamp,
}

/// A single dynamically typed column value.
///
/// Values of different variants never compare equal. Ordering between values
/// of the same variant follows the natural ordering of the inner type.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum FieldValue {
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Opaque bytes.
    Blob(Bytes),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Returns the column type this value belongs to.
    pub fn field_type(&self) -> Type {
        match self {
            Self::Bool(_) => Type::Bool,
            Self::Int32(_) => Type::Int32,
            Self::Int64(_) => Type::Int64,
            Self::Double(_) => Type::Double,
            Self::String(_) => Type::String,
            Self::Blob(_) => Type::Blob,
            Self::Timestamp(_) => Type::Timestamp,
        }
    }

    /// Returns the inner bytes for `Blob` values.
    pub fn as_blob(&self) -> Option<&Bytes> {
        match self {
            Self::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the inner string for `String` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if both values hold the same variant.
    pub fn same_type(&self, other: &FieldValue) -> bool {
        self.field_type() == other.field_type()
    }

    /// Total ordering over all values, used where a stable order is required.
    ///
    /// Values of different variants order by variant. Doubles order by
    /// [`f64::total_cmp`], so `NaN` has a fixed position.
    pub fn total_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int32(a), Self::Int32(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Blob(a), Self::Blob(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int32(_) => 1,
            Self::Int64(_) => 2,
            Self::Double(_) => 3,
            Self::String(_) => 4,
            Self::Blob(_) => 5,
            Self::Timestamp(_) => 6,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Bytes> for FieldValue {
    fn from(value: Bytes) -> Self {
        Self::Blob(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(Bytes::from(value))
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}
