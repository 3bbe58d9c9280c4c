//! Index declarations read from configuration.

use serde::{Deserialize, Serialize};

use searchsync_core::RecordClass;

use crate::definition::{
    FieldKind, FieldRole, FieldSource, FieldSpec, IndexedClass, SchemaBuilder, SearchIndex,
};

/// A covered class: either just a name (subclasses included) or a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassEntry {
    /// `"Page"`
    Name(RecordClass),
    /// `{ class = "Page", include_subclasses = false }`
    Full(IndexedClass),
}

impl ClassEntry {
    fn into_indexed(self) -> IndexedClass {
        match self {
            ClassEntry::Name(class) => IndexedClass {
                class,
                include_subclasses: true,
            },
            ClassEntry::Full(indexed) => indexed,
        }
    }
}

/// One configured field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Engine field name
    pub name: String,

    /// Value type
    #[serde(default = "default_kind")]
    pub kind: FieldKind,

    /// Search role
    #[serde(default = "default_role")]
    pub role: FieldRole,

    /// Record field to read, defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Record fields joined into a derived text field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

fn default_kind() -> FieldKind {
    FieldKind::Text
}

fn default_role() -> FieldRole {
    FieldRole::FullText
}

impl FieldConfig {
    fn to_spec(&self) -> FieldSpec {
        let source = if self.sources.is_empty() {
            FieldSource::Record(self.source.clone().unwrap_or_else(|| self.name.clone()))
        } else {
            FieldSource::Derived(self.sources.clone())
        };
        FieldSpec {
            name: self.name.clone(),
            kind: self.kind,
            source,
            role: self.role,
        }
    }
}

/// One `[[indexes]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index name
    pub name: String,

    /// Engine core, defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<String>,

    /// Covered classes
    #[serde(default)]
    pub classes: Vec<ClassEntry>,

    /// Fields
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// A [`SearchIndex`] declared in configuration rather than code.
#[derive(Debug, Clone)]
pub struct ConfiguredIndex {
    config: IndexConfig,
}

impl ConfiguredIndex {
    /// Wraps a config table.
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    /// The underlying config.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

impl SearchIndex for ConfiguredIndex {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn core(&self) -> &str {
        self.config.core.as_deref().unwrap_or(&self.config.name)
    }

    fn init(&self, schema: &mut SchemaBuilder) {
        for entry in &self.config.classes {
            let indexed = entry.clone().into_indexed();
            schema.add_class(indexed.class, indexed.include_subclasses);
        }
        for field in &self.config.fields {
            schema.add_field(field.to_spec());
        }
    }
}
