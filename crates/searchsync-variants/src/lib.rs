//! Search variants for searchsync.
//!
//! A search variant reinterprets one record as several documents, each
//! scoped to a variant value (draft vs. published stage, owning subsite).
//! The [`VariantRegistry`] caches which variants apply to each class and
//! expands records into their [`Expansion`]s.

pub mod config;
pub mod registry;
pub mod subsites;
pub mod variant;
pub mod versioned;

#[cfg(test)]
mod proptests;

pub use config::VariantConfig;
pub use registry::{Expansion, VariantRegistry, VariantSet};
pub use subsites::SubsiteVariant;
pub use variant::{SearchVariant, VariantOutcome};
pub use versioned::VersionedVariant;
