//! The `searchsync` configuration file.
//!
//! One TOML file with a table per component. Every table is optional and
//! falls back to its defaults; `[[indexes]]` declares the search indexes.
//! Path resolution order: `--config`, then `SEARCHSYNC_CONFIG`, then
//! `<config dir>/searchsync/config.toml`. After parsing,
//! `SEARCHSYNC_SOLR_URL` overrides `solr.base_url`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use searchsync_core::{Error, Result};
use searchsync_index::{ClassEntry, FieldConfig, FieldKind, FieldRole, IndexConfig, SolrConfig};
use searchsync_reindex::ReindexConfig;
use searchsync_updater::UpdaterConfig;
use searchsync_variants::VariantConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SEARCHSYNC_CONFIG";

/// Environment variable overriding `solr.base_url`.
pub const SOLR_URL_ENV: &str = "SEARCHSYNC_SOLR_URL";

/// Full configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchsyncConfig {
    /// Engine connection
    #[serde(default)]
    pub solr: SolrConfig,

    /// Live updater
    #[serde(default)]
    pub updater: UpdaterConfig,

    /// Reindex jobs
    #[serde(default)]
    pub reindex: ReindexConfig,

    /// Built-in variants
    #[serde(default)]
    pub variants: VariantConfig,

    /// Declared indexes
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
}

impl SearchsyncConfig {
    /// `<config dir>/searchsync/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("searchsync").join("config.toml"))
    }

    /// Resolves the config path from an explicit path, then the
    /// environment, then the platform default.
    pub fn resolve_path(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| env(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
            .or_else(Self::default_path)
    }

    /// Loads the configuration using the process environment.
    ///
    /// A missing file at the default location yields the defaults; a
    /// missing file that was named explicitly is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// Loads the configuration with an injectable environment lookup.
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let named = explicit.is_some() || env(CONFIG_ENV).is_some_and(|v| !v.is_empty());
        let mut config = match Self::resolve_path(explicit, &env) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if named => {
                return Err(Error::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            _ => Self::default(),
        };
        config.apply_env(&env);
        Ok(config)
    }

    /// Parses one file without applying environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Parses TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Serializes to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Starter configuration written by `config init`.
    pub fn sample() -> Self {
        Self {
            indexes: vec![IndexConfig {
                name: "main".to_string(),
                core: None,
                classes: vec![ClassEntry::Name("SiteTree".into())],
                fields: vec![
                    FieldConfig {
                        name: "Title".to_string(),
                        kind: FieldKind::Text,
                        role: FieldRole::FullText,
                        source: None,
                        sources: Vec::new(),
                    },
                    FieldConfig {
                        name: "Content".to_string(),
                        kind: FieldKind::Text,
                        role: FieldRole::FullText,
                        source: None,
                        sources: Vec::new(),
                    },
                ],
            }],
            ..Self::default()
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(url) = env(SOLR_URL_ENV).filter(|v| !v.is_empty()) {
            tracing::debug!(url = %url, "solr.base_url overridden from {SOLR_URL_ENV}");
            self.solr.base_url = url;
        }
    }
}
