//! Index definitions: which classes an index covers and how records map to
//! documents.
//!
//! An index is declared by implementing [`SearchIndex`]. Its
//! [`SearchIndex::init`] method describes the schema through a
//! [`SchemaBuilder`]; [`IndexDefinition::from_index`] validates the result
//! once so the rest of the system can rely on it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use searchsync_core::{
    DocumentId, Error, FieldValue, HostSchema, IndexDocument, Record, RecordClass, Result,
};

/// Value type of an index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Exact-match string
    String,
    /// Tokenized full-text
    Text,
    /// 64-bit integer
    Int,
    /// Floating point
    Float,
    /// Boolean
    Bool,
    /// Timestamp, stored as UTC `YYYY-MM-DDTHH:MM:SSZ`
    Date,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Text => "text",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Date => "date",
        };
        write!(f, "{name}")
    }
}

/// 2^63: integral floats in `[-2^63, 2^63)` convert to `i64` exactly.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

impl FieldKind {
    /// Coerces a record value into this kind.
    ///
    /// Lists coerce element-wise into multi-valued fields. The error is a
    /// human-readable reason; callers attach the record and field.
    pub fn coerce(&self, value: &FieldValue) -> std::result::Result<FieldValue, String> {
        if let FieldValue::List(items) = value {
            let coerced = items
                .iter()
                .map(|item| match item {
                    FieldValue::List(_) => Err("nested lists are not indexable".to_string()),
                    other => self.coerce(other),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            return Ok(FieldValue::List(coerced));
        }

        match (self, value) {
            (_, FieldValue::Null) => Ok(FieldValue::Null),

            (FieldKind::String | FieldKind::Text, FieldValue::Text(s)) => {
                Ok(FieldValue::Text(s.clone()))
            }
            (FieldKind::String | FieldKind::Text, FieldValue::Int(i)) => {
                Ok(FieldValue::Text(i.to_string()))
            }
            (FieldKind::String | FieldKind::Text, FieldValue::Float(x)) => {
                Ok(FieldValue::Text(x.to_string()))
            }
            (FieldKind::String | FieldKind::Text, FieldValue::Bool(b)) => {
                Ok(FieldValue::Text(b.to_string()))
            }

            (FieldKind::Int, FieldValue::Int(i)) => Ok(FieldValue::Int(*i)),
            (FieldKind::Int, FieldValue::Float(x))
                if x.fract() == 0.0 && (-I64_LIMIT..I64_LIMIT).contains(x) =>
            {
                Ok(FieldValue::Int(*x as i64))
            }
            (FieldKind::Int, FieldValue::Float(x)) => {
                Err(format!("{x} is not an integer in the 64-bit range"))
            }
            (FieldKind::Int, FieldValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|_| format!("'{s}' is not an integer")),

            (FieldKind::Float, FieldValue::Float(x)) => Ok(FieldValue::Float(*x)),
            (FieldKind::Float, FieldValue::Int(i)) => Ok(FieldValue::Float(*i as f64)),
            (FieldKind::Float, FieldValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| format!("'{s}' is not a number")),

            (FieldKind::Bool, FieldValue::Bool(b)) => Ok(FieldValue::Bool(*b)),
            (FieldKind::Bool, FieldValue::Int(0)) => Ok(FieldValue::Bool(false)),
            (FieldKind::Bool, FieldValue::Int(1)) => Ok(FieldValue::Bool(true)),
            (FieldKind::Bool, FieldValue::Text(s)) => match s.trim() {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" | "" => Ok(FieldValue::Bool(false)),
                other => Err(format!("'{other}' is not a boolean")),
            },

            (FieldKind::Date, FieldValue::Text(s)) => parse_date(s)
                .map(|dt| FieldValue::Text(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())),

            (kind, other) => Err(format!("cannot index {} as {kind}", other.type_name())),
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (naive, read as UTC) and bare dates.
fn parse_date(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(format!("'{s}' is not a date"))
}

/// Where an index field takes its value from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// A single record field.
    Record(String),
    /// Several record fields joined as text.
    Derived(Vec<String>),
}

impl FieldSource {
    /// Record fields this source reads.
    pub fn record_fields(&self) -> Vec<&str> {
        match self {
            FieldSource::Record(field) => vec![field.as_str()],
            FieldSource::Derived(fields) => fields.iter().map(String::as_str).collect(),
        }
    }
}

/// How a field participates in search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Exact filtering and faceting
    Filter,
    /// Full-text matching
    FullText,
    /// Result ordering
    Sort,
}

/// One field of an index schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name in the engine
    pub name: String,
    /// Value type
    pub kind: FieldKind,
    /// Where the value comes from
    pub source: FieldSource,
    /// Search role
    pub role: FieldRole,
}

/// A class covered by an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedClass {
    /// Covered class
    pub class: RecordClass,
    /// Whether subclasses are covered too
    #[serde(default = "default_true")]
    pub include_subclasses: bool,
}

fn default_true() -> bool {
    true
}

/// Collects the schema declared by [`SearchIndex::init`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    classes: Vec<IndexedClass>,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Covers `class`, optionally with its subclasses.
    pub fn add_class(
        &mut self,
        class: impl Into<RecordClass>,
        include_subclasses: bool,
    ) -> &mut Self {
        self.classes.push(IndexedClass {
            class: class.into(),
            include_subclasses,
        });
        self
    }

    /// Adds a filterable field read from the record field of the same name.
    pub fn add_filter_field(&mut self, name: impl Into<String>, kind: FieldKind) -> &mut Self {
        let name = name.into();
        self.add_field(FieldSpec {
            source: FieldSource::Record(name.clone()),
            name,
            kind,
            role: FieldRole::Filter,
        })
    }

    /// Adds a full-text field read from the record field of the same name.
    pub fn add_fulltext_field(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.add_field(FieldSpec {
            source: FieldSource::Record(name.clone()),
            name,
            kind: FieldKind::Text,
            role: FieldRole::FullText,
        })
    }

    /// Adds a full-text field concatenating several record fields.
    pub fn add_derived_fulltext<I, S>(&mut self, name: impl Into<String>, sources: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_field(FieldSpec {
            name: name.into(),
            kind: FieldKind::Text,
            source: FieldSource::Derived(sources.into_iter().map(Into::into).collect()),
            role: FieldRole::FullText,
        })
    }

    /// Adds a sortable field read from the record field of the same name.
    pub fn add_sort_field(&mut self, name: impl Into<String>, kind: FieldKind) -> &mut Self {
        let name = name.into();
        self.add_field(FieldSpec {
            source: FieldSource::Record(name.clone()),
            name,
            kind,
            role: FieldRole::Sort,
        })
    }

    /// Adds a fully specified field.
    pub fn add_field(&mut self, spec: FieldSpec) -> &mut Self {
        self.fields.push(spec);
        self
    }
}

/// A declared search index.
///
/// This is the single extension point for new indexes: name the index,
/// name the engine core it lives in, and declare its schema.
pub trait SearchIndex: Send + Sync {
    /// Unique index name.
    fn name(&self) -> &str;

    /// Engine core (collection) holding the documents. Defaults to the name.
    fn core(&self) -> &str {
        self.name()
    }

    /// Declares covered classes and fields.
    fn init(&self, schema: &mut SchemaBuilder);
}

/// A validated index schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Unique index name
    pub name: String,
    /// Engine core
    pub core: String,
    /// Covered classes, in declaration order
    pub classes: Vec<IndexedClass>,
    /// Fields, in declaration order
    pub fields: Vec<FieldSpec>,
}

impl IndexDefinition {
    /// Runs the index's `init` and validates the declared schema.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is empty, no class is
    /// covered, a field name repeats or collides with a reserved field, or a
    /// derived field is not text or has no sources.
    pub fn from_index(index: &dyn SearchIndex) -> Result<Self> {
        let mut schema = SchemaBuilder::new();
        index.init(&mut schema);
        let definition = Self {
            name: index.name().to_string(),
            core: index.core().to_string(),
            classes: schema.classes,
            fields: schema.fields,
        };
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation_field("name", "index name cannot be empty"));
        }
        if self.core.trim().is_empty() {
            return Err(Error::validation_field(
                "core",
                format!("index '{}' has an empty core", self.name),
            ));
        }
        if self.classes.is_empty() {
            return Err(Error::validation_field(
                "classes",
                format!("index '{}' covers no classes", self.name),
            ));
        }

        let reserved = [
            IndexDocument::DOCUMENT_ID_FIELD,
            IndexDocument::CLASS_FIELD,
            IndexDocument::HIERARCHY_FIELD,
            IndexDocument::KEY_FIELD,
        ];
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(Error::validation_field(
                    "fields",
                    format!("index '{}' has a field with an empty name", self.name),
                ));
            }
            if reserved.contains(&field.name.as_str())
                || field.name.starts_with(IndexDocument::VARIANT_FIELD_PREFIX)
            {
                return Err(Error::validation_field(
                    field.name.clone(),
                    format!("'{}' is a reserved field name", field.name),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::validation_field(
                    field.name.clone(),
                    format!("field '{}' declared twice in '{}'", field.name, self.name),
                ));
            }
            if let FieldSource::Derived(sources) = &field.source {
                if field.kind != FieldKind::Text {
                    return Err(Error::validation_field(
                        field.name.clone(),
                        "derived fields must be text",
                    ));
                }
                if sources.is_empty() {
                    return Err(Error::validation_field(
                        field.name.clone(),
                        "derived fields need at least one source",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Whether records of `class` belong in this index.
    pub fn covers(&self, class: &RecordClass, host: &dyn HostSchema) -> bool {
        self.classes.iter().any(|indexed| {
            &indexed.class == class
                || (indexed.include_subclasses && host.is_subclass_of(class, &indexed.class))
        })
    }

    /// The declared class entry covering `class`, if any.
    pub fn covering_entry(&self, class: &RecordClass, host: &dyn HostSchema) -> Option<&IndexedClass> {
        self.classes.iter().find(|indexed| {
            &indexed.class == class
                || (indexed.include_subclasses && host.is_subclass_of(class, &indexed.class))
        })
    }

    /// Record fields read by this index.
    pub fn indexed_fields(&self) -> BTreeSet<String> {
        self.fields
            .iter()
            .flat_map(|f| f.source.record_fields())
            .map(str::to_string)
            .collect()
    }

    /// Looks up a field by engine name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Maps a record view to the document `id`.
    ///
    /// Missing and null record fields are left out of the document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] naming the first field whose value cannot
    /// be coerced to the declared kind.
    pub fn build_document(
        &self,
        id: DocumentId,
        view: &Record,
        host: &dyn HostSchema,
    ) -> Result<IndexDocument> {
        let mut fields = BTreeMap::new();
        for spec in &self.fields {
            let raw = match &spec.source {
                FieldSource::Record(source) => view.field(source).cloned(),
                FieldSource::Derived(sources) => derive_text(view, sources),
            };
            let Some(raw) = raw else { continue };
            let value = spec.kind.coerce(&raw).map_err(|reason| {
                Error::schema_field(view.class.to_string(), view.key.get(), &spec.name, reason)
            })?;
            if !value.is_null() {
                fields.insert(spec.name.clone(), value);
            }
        }

        Ok(IndexDocument {
            id,
            hierarchy: host.ancestry(&view.class),
            fields,
        })
    }
}

fn derive_text(view: &Record, sources: &[String]) -> Option<FieldValue> {
    let parts: Vec<String> = sources
        .iter()
        .filter_map(|name| view.field(name))
        .filter_map(text_of)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(FieldValue::Text(parts.join(" ")))
    }
}

fn text_of(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Null => None,
        FieldValue::Bool(b) => Some(b.to_string()),
        FieldValue::Int(i) => Some(i.to_string()),
        FieldValue::Float(x) => Some(x.to_string()),
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::List(items) => {
            let joined: Vec<String> = items.iter().filter_map(text_of).collect();
            Some(joined.join(" "))
        }
    }
}
