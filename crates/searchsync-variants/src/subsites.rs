//! Per-subsite variant for multi-tenant installs.

use searchsync_core::{Capability, Error, FieldValue, HostSchema, Record, RecordClass, Result};

use crate::variant::{SearchVariant, VariantOutcome};

/// Default name of the integer field holding the owning subsite.
pub const DEFAULT_SUBSITE_FIELD: &str = "subsite_id";

/// Subsite id used for records without one (the main site).
pub const MAIN_SITE: i64 = 0;

/// Scopes each record's documents to the subsite that owns it.
#[derive(Debug, Clone)]
pub struct SubsiteVariant {
    subsite_field: String,
}

impl SubsiteVariant {
    /// Coordinate name.
    pub const NAME: &'static str = "subsite";

    /// Creates the variant reading the default `subsite_id` field.
    pub fn new() -> Self {
        Self::with_subsite_field(DEFAULT_SUBSITE_FIELD)
    }

    /// Creates the variant reading a custom subsite field.
    pub fn with_subsite_field(field: impl Into<String>) -> Self {
        Self {
            subsite_field: field.into(),
        }
    }

    /// Name of the field read by this variant.
    pub fn subsite_field(&self) -> &str {
        &self.subsite_field
    }

    /// Subsite owning a record.
    pub fn subsite_of(&self, record: &Record) -> Result<i64> {
        match record.field(&self.subsite_field) {
            None | Some(FieldValue::Null) => Ok(MAIN_SITE),
            Some(FieldValue::Int(id)) if *id >= 0 => Ok(*id),
            Some(other) => Err(Error::variant(
                Self::NAME,
                format!(
                    "{}#{}: field '{}' must be a non-negative int, got {:?}",
                    record.class, record.key, self.subsite_field, other
                ),
            )),
        }
    }
}

impl Default for SubsiteVariant {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchVariant for SubsiteVariant {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn applies_to(&self, class: &RecordClass, host: &dyn HostSchema) -> bool {
        host.has_capability(class, Capability::Subsites)
    }

    fn apply(&self, record: &Record) -> Result<Vec<VariantOutcome>> {
        let subsite = self.subsite_of(record)?;
        Ok(vec![VariantOutcome::Present {
            value: subsite.to_string(),
            view: record.clone(),
        }])
    }

    fn tracked_fields(&self) -> Vec<String> {
        vec![self.subsite_field.clone()]
    }

    fn is_exclusive(&self) -> bool {
        true
    }
}
