//! The variant strategy trait.

use std::fmt;

use searchsync_core::{HostSchema, Record, RecordClass, Result};

/// One outcome of applying a variant to a record.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantOutcome {
    /// A document must exist for this value, built from `view`.
    Present {
        /// Variant value (e.g. `Live`, `2`)
        value: String,
        /// The record as seen under this value
        view: Record,
    },

    /// No document may exist for this value.
    Absent {
        /// Variant value (e.g. `Live` for an unpublished record)
        value: String,
    },
}

impl VariantOutcome {
    /// The variant value of this outcome.
    pub fn value(&self) -> &str {
        match self {
            VariantOutcome::Present { value, .. } | VariantOutcome::Absent { value } => value,
        }
    }
}

/// A strategy that reinterprets a base record as zero or more variants.
///
/// Implementations must be deterministic and free of side effects. For a
/// well-formed record of a class the strategy applies to, `apply` must not
/// fail; a malformed controlling field is reported as
/// [`searchsync_core::Error::VariantExpansion`].
pub trait SearchVariant: Send + Sync + fmt::Debug {
    /// Coordinate name in [`searchsync_core::VariantKey`] (e.g. `stage`).
    fn name(&self) -> &str;

    /// Typed applicability predicate for a record class.
    fn applies_to(&self, class: &RecordClass, host: &dyn HostSchema) -> bool;

    /// Expands one record into its variant outcomes.
    fn apply(&self, record: &Record) -> Result<Vec<VariantOutcome>>;

    /// Record fields whose change alters the expansion.
    fn tracked_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether a record holds exactly one value of this variant at a time.
    ///
    /// When it does, a record that changes value leaves stale documents
    /// under its old value.
    fn is_exclusive(&self) -> bool {
        false
    }
}
