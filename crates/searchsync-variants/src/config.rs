//! Which built-in variants are enabled.

use serde::{Deserialize, Serialize};

use crate::subsites::DEFAULT_SUBSITE_FIELD;
use crate::versioned::DEFAULT_PUBLISHED_FIELD;

/// Variant configuration, usually the `[variants]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Enable the draft/published stage variant
    #[serde(default = "default_true")]
    pub versioned: bool,

    /// Boolean field marking a record as published
    #[serde(default = "default_published_field")]
    pub published_field: String,

    /// Enable the per-subsite variant
    #[serde(default)]
    pub subsites: bool,

    /// Integer field holding the owning subsite
    #[serde(default = "default_subsite_field")]
    pub subsite_field: String,
}

fn default_true() -> bool {
    true
}

fn default_published_field() -> String {
    DEFAULT_PUBLISHED_FIELD.to_string()
}

fn default_subsite_field() -> String {
    DEFAULT_SUBSITE_FIELD.to_string()
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            versioned: true,
            published_field: default_published_field(),
            subsites: false,
            subsite_field: default_subsite_field(),
        }
    }
}
