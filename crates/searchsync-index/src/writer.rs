//! Index writers: where documents for one index definition go.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use searchsync_core::{DocumentId, IndexDocument, RecordClass, RecordKey, Result};

use crate::definition::IndexDefinition;
use crate::service::SolrService;

/// A slice of one class's documents, by record key.
///
/// Bounds are `(after, through]`; a missing bound is open. Used by the
/// reindex runner to drop documents whose records no longer exist, and by
/// the updater to drop a record's documents in scopes it has left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    /// Class whose documents are targeted
    pub class: RecordClass,
    /// Match subclasses through the class hierarchy field
    pub include_subclasses: bool,
    /// Exclusive lower bound
    pub after: Option<RecordKey>,
    /// Inclusive upper bound
    pub through: Option<RecordKey>,
    /// Restrict to documents with these variant values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,
    /// Skip documents with these variant values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub excluded: BTreeMap<String, String>,
}

impl KeyRange {
    /// A range over every document of `class`.
    pub fn all(class: RecordClass, include_subclasses: bool) -> Self {
        Self {
            class,
            include_subclasses,
            after: None,
            through: None,
            variants: BTreeMap::new(),
            excluded: BTreeMap::new(),
        }
    }

    /// Every document of one record of `class` (subclasses not matched).
    pub fn record(class: RecordClass, key: RecordKey) -> Self {
        Self::all(class, false)
            .after(key.get().checked_sub(1).map(RecordKey::new))
            .through(Some(key))
    }

    /// Sets the exclusive lower bound.
    pub fn after(mut self, key: Option<RecordKey>) -> Self {
        self.after = key;
        self
    }

    /// Sets the inclusive upper bound.
    pub fn through(mut self, key: Option<RecordKey>) -> Self {
        self.through = key;
        self
    }

    /// Restricts the range to one variant value.
    pub fn with_variant(mut self, variant: impl Into<String>, value: impl Into<String>) -> Self {
        self.variants.insert(variant.into(), value.into());
        self
    }

    /// Skips documents carrying `value` for `variant`.
    pub fn excluding_variant(
        mut self,
        variant: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.excluded.insert(variant.into(), value.into());
        self
    }

    /// Whether a document falls inside the range.
    pub fn contains(&self, doc: &IndexDocument) -> bool {
        let class_matches = if self.include_subclasses {
            doc.hierarchy.contains(&self.class) || doc.id.class == self.class
        } else {
            doc.id.class == self.class
        };
        class_matches
            && self.after.is_none_or(|after| doc.id.key > after)
            && self.through.is_none_or(|through| doc.id.key <= through)
            && doc.id.variant.matches(&self.variants)
            && self
                .excluded
                .iter()
                .all(|(variant, value)| doc.id.variant.get(variant) != Some(value.as_str()))
    }

    /// Engine query selecting the range.
    ///
    /// ```
    /// use searchsync_core::{RecordClass, RecordKey};
    /// use searchsync_index::KeyRange;
    ///
    /// let range = KeyRange::all(RecordClass::new("Page"), true)
    ///     .after(Some(RecordKey::new(100)))
    ///     .through(Some(RecordKey::new(200)));
    /// assert_eq!(range.to_query(), r#"ClassHierarchy:"Page" AND ID:{100 TO 200]"#);
    /// ```
    pub fn to_query(&self) -> String {
        let class_field = if self.include_subclasses {
            IndexDocument::HIERARCHY_FIELD
        } else {
            IndexDocument::CLASS_FIELD
        };
        let lower = match self.after {
            Some(key) => format!("{{{key}"),
            None => "[*".to_string(),
        };
        let upper = match self.through {
            Some(key) => format!("{key}]"),
            None => "*]".to_string(),
        };
        let mut query = format!(
            "{class_field}:{} AND {}:{lower} TO {upper}",
            quote(self.class.as_str()),
            IndexDocument::KEY_FIELD
        );
        for (variant, value) in &self.variants {
            query.push_str(&format!(
                " AND {}:{}",
                IndexDocument::variant_field(variant),
                quote(value)
            ));
        }
        for (variant, value) in &self.excluded {
            query.push_str(&format!(
                " AND -{}:{}",
                IndexDocument::variant_field(variant),
                quote(value)
            ));
        }
        query
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lower = self.after.map(|k| k.to_string()).unwrap_or_default();
        let upper = self.through.map(|k| k.to_string()).unwrap_or_else(|| "∞".to_string());
        write!(f, "{}({lower}, {upper}]", self.class)
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Writes documents for one index definition.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// The definition this writer serves.
    fn definition(&self) -> &IndexDefinition;

    /// Index name, shorthand for `definition().name`.
    fn name(&self) -> &str {
        &self.definition().name
    }

    /// Adds or replaces documents.
    async fn upsert(&self, documents: &[IndexDocument]) -> Result<()>;

    /// Removes documents by identity.
    async fn delete(&self, ids: &[DocumentId]) -> Result<()>;

    /// Removes every document in `range`.
    async fn delete_range(&self, range: &KeyRange) -> Result<()>;
}

/// Writer backed by a Solr core.
#[derive(Debug, Clone)]
pub struct SolrIndex {
    definition: IndexDefinition,
    service: Arc<SolrService>,
}

impl SolrIndex {
    /// Creates a writer for `definition` over `service`.
    pub fn new(definition: IndexDefinition, service: Arc<SolrService>) -> Self {
        Self {
            definition,
            service,
        }
    }

    /// The engine client.
    pub fn service(&self) -> &Arc<SolrService> {
        &self.service
    }
}

#[async_trait]
impl IndexWriter for SolrIndex {
    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    async fn upsert(&self, documents: &[IndexDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        self.service.add(&self.definition.core, documents).await?;
        Ok(())
    }

    async fn delete(&self, ids: &[DocumentId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = ids.iter().map(DocumentId::engine_key).collect();
        self.service.delete_by_id(&self.definition.core, &keys).await?;
        Ok(())
    }

    async fn delete_range(&self, range: &KeyRange) -> Result<()> {
        self.service
            .delete_by_query(&self.definition.core, &range.to_query())
            .await?;
        Ok(())
    }
}
