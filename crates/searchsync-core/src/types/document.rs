//! Index document identities and the operations pending against them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{FieldValue, RecordClass, RecordKey};

/// Variant coordinates of one document, e.g. `stage=Live,subsite=2`.
///
/// Empty when no variant applies to the record's class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantKey(BTreeMap<String, String>);

impl VariantKey {
    /// The empty key (no variants).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a copy of this key with one more coordinate.
    pub fn with(&self, variant: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.0.clone();
        next.insert(variant.into(), value.into());
        Self(next)
    }

    /// Value of a single coordinate.
    pub fn get(&self, variant: &str) -> Option<&str> {
        self.0.get(variant).map(String::as_str)
    }

    /// Returns `true` when no variant applies.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(variant, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` if every coordinate in `filter` matches this key.
    pub fn matches(&self, filter: &BTreeMap<String, String>) -> bool {
        filter
            .iter()
            .all(|(variant, value)| self.0.get(variant) == Some(value))
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (variant, value) in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{variant}={value}")?;
            first = false;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariantKey {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Identity of one document in one index.
///
/// Two operations on the same `DocumentId` within a unit of work coalesce.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId {
    /// Name of the index definition
    pub index: String,
    /// Concrete record class
    pub class: RecordClass,
    /// Record primary key
    pub key: RecordKey,
    /// Variant coordinates
    pub variant: VariantKey,
}

impl DocumentId {
    /// Creates a document identity.
    pub fn new(
        index: impl Into<String>,
        class: RecordClass,
        key: RecordKey,
        variant: VariantKey,
    ) -> Self {
        Self {
            index: index.into(),
            class,
            key,
            variant,
        }
    }

    /// The unique key stored in the engine's `_documentid` field.
    ///
    /// Format: `<key>-<class>` followed by `-<variant>` when variants apply.
    ///
    /// # Examples
    ///
    /// ```
    /// use searchsync_core::{DocumentId, RecordClass, RecordKey, VariantKey};
    ///
    /// let id = DocumentId::new(
    ///     "main",
    ///     RecordClass::new("Page"),
    ///     RecordKey::new(3),
    ///     VariantKey::empty().with("stage", "Live"),
    /// );
    /// assert_eq!(id.engine_key(), "3-Page-stage=Live");
    /// ```
    pub fn engine_key(&self) -> String {
        if self.variant.is_empty() {
            format!("{}-{}", self.key, self.class)
        } else {
            format!("{}-{}-{}", self.key, self.class, self.variant)
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.engine_key())
    }
}

/// A document ready to submit to the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Identity of this document
    pub id: DocumentId,

    /// Ancestry of the record class, concrete class first
    pub hierarchy: Vec<RecordClass>,

    /// Mapped field values by index field name
    pub fields: BTreeMap<String, FieldValue>,
}

impl IndexDocument {
    /// Reserved field holding [`DocumentId::engine_key`].
    pub const DOCUMENT_ID_FIELD: &'static str = "_documentid";
    /// Reserved field holding the concrete class name.
    pub const CLASS_FIELD: &'static str = "ClassName";
    /// Reserved multi-valued field holding the class ancestry.
    pub const HIERARCHY_FIELD: &'static str = "ClassHierarchy";
    /// Reserved field holding the record key.
    pub const KEY_FIELD: &'static str = "ID";
    /// Prefix of the per-variant reserved fields.
    pub const VARIANT_FIELD_PREFIX: &'static str = "_variant_";

    /// Engine field name for a variant coordinate.
    pub fn variant_field(variant: &str) -> String {
        format!("{}{variant}", Self::VARIANT_FIELD_PREFIX)
    }

    /// Flattens the document into the engine's JSON shape, reserved fields included.
    pub fn to_engine_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            Self::DOCUMENT_ID_FIELD.to_string(),
            serde_json::Value::String(self.id.engine_key()),
        );
        map.insert(
            Self::CLASS_FIELD.to_string(),
            serde_json::Value::String(self.id.class.to_string()),
        );
        map.insert(
            Self::HIERARCHY_FIELD.to_string(),
            serde_json::Value::Array(
                self.hierarchy
                    .iter()
                    .map(|c| serde_json::Value::String(c.to_string()))
                    .collect(),
            ),
        );
        map.insert(
            Self::KEY_FIELD.to_string(),
            serde_json::Value::from(self.id.key.get()),
        );
        for (variant, value) in self.id.variant.iter() {
            map.insert(
                Self::variant_field(variant),
                serde_json::Value::String(value.to_string()),
            );
        }
        for (name, value) in &self.fields {
            // FieldValue serializes untagged, so this cannot fail
            if let Ok(json) = serde_json::to_value(value) {
                map.insert(name.clone(), json);
            }
        }
        serde_json::Value::Object(map)
    }
}

/// The latest operation pending for one document identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOp {
    /// Add or replace the document.
    Upsert(IndexDocument),
    /// Remove the document.
    Delete,
}

impl PendingOp {
    /// Returns `true` for deletes.
    pub fn is_delete(&self) -> bool {
        matches!(self, PendingOp::Delete)
    }
}
