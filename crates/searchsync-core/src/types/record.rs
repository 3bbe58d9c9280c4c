//! Host records and their lifecycle events.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{RecordClass, RecordKey};

/// A single field value on a host record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Missing or SQL NULL.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Multi-valued field (e.g. tags, relation ids).
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns `true` for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the boolean if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text if this is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::List(_) => "list",
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// A host-managed structured record, identified by `(class, key)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Concrete class of the record
    pub class: RecordClass,

    /// Primary key
    pub key: RecordKey,

    /// Field values by name
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates a record with no fields.
    pub fn new(class: impl Into<RecordClass>, key: u64) -> Self {
        Self {
            class: class.into(),
            key: RecordKey::new(key),
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a field value, treating a missing field as absent.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Sets a field in place.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }
}

/// A lifecycle notification from the host persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecordEvent {
    /// The record was created or updated (after commit).
    Written {
        /// Record as written
        record: Record,

        /// Fields the write touched, when the host tracks them.
        ///
        /// `None` means "unknown" and always triggers reindexing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        changed_fields: Option<BTreeSet<String>>,
    },

    /// The record was deleted (after commit). Carries the last snapshot.
    Deleted {
        /// Record as it was before deletion
        record: Record,
    },
}

impl RecordEvent {
    /// Creates a write event with unknown changed fields.
    pub fn written(record: Record) -> Self {
        RecordEvent::Written {
            record,
            changed_fields: None,
        }
    }

    /// Creates a write event listing the changed fields.
    pub fn written_fields<I, S>(record: Record, changed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RecordEvent::Written {
            record,
            changed_fields: Some(changed.into_iter().map(Into::into).collect()),
        }
    }

    /// Creates a delete event.
    pub fn deleted(record: Record) -> Self {
        RecordEvent::Deleted { record }
    }

    /// The record the event refers to.
    pub fn record(&self) -> &Record {
        match self {
            RecordEvent::Written { record, .. } | RecordEvent::Deleted { record } => record,
        }
    }

    /// Returns `true` for delete events.
    pub fn is_delete(&self) -> bool {
        matches!(self, RecordEvent::Deleted { .. })
    }
}
