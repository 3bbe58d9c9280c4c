//! Draft/published stage variant.

use searchsync_core::{Capability, Error, FieldValue, HostSchema, Record, RecordClass, Result};

use crate::variant::{SearchVariant, VariantOutcome};

/// Draft stage value.
pub const STAGE_DRAFT: &str = "Stage";

/// Published stage value.
pub const STAGE_LIVE: &str = "Live";

/// Default name of the boolean field marking a record as published.
pub const DEFAULT_PUBLISHED_FIELD: &str = "published";

/// Indexes versioned records once per stage.
///
/// The draft stage always has a document. The live stage has one only
/// while the record is published; otherwise the live document is absent
/// and any stale copy gets deleted.
#[derive(Debug, Clone)]
pub struct VersionedVariant {
    published_field: String,
}

impl VersionedVariant {
    /// Coordinate name.
    pub const NAME: &'static str = "stage";

    /// Creates the variant reading the default `published` field.
    pub fn new() -> Self {
        Self::with_published_field(DEFAULT_PUBLISHED_FIELD)
    }

    /// Creates the variant reading a custom published flag.
    pub fn with_published_field(field: impl Into<String>) -> Self {
        Self {
            published_field: field.into(),
        }
    }

    fn is_published(&self, record: &Record) -> Result<bool> {
        match record.field(&self.published_field) {
            None | Some(FieldValue::Null) => Ok(false),
            Some(FieldValue::Bool(b)) => Ok(*b),
            Some(other) => Err(Error::variant(
                Self::NAME,
                format!(
                    "{}#{}: field '{}' must be a bool, got {}",
                    record.class,
                    record.key,
                    self.published_field,
                    other.type_name()
                ),
            )),
        }
    }
}

impl Default for VersionedVariant {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchVariant for VersionedVariant {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn applies_to(&self, class: &RecordClass, host: &dyn HostSchema) -> bool {
        host.has_capability(class, Capability::Versioned)
    }

    fn apply(&self, record: &Record) -> Result<Vec<VariantOutcome>> {
        let draft = VariantOutcome::Present {
            value: STAGE_DRAFT.to_string(),
            view: record.clone(),
        };
        let live = if self.is_published(record)? {
            VariantOutcome::Present {
                value: STAGE_LIVE.to_string(),
                view: record.clone(),
            }
        } else {
            VariantOutcome::Absent {
                value: STAGE_LIVE.to_string(),
            }
        };
        Ok(vec![draft, live])
    }

    fn tracked_fields(&self) -> Vec<String> {
        vec![self.published_field.clone()]
    }
}
