//! Common fixtures for CLI integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use searchsync_cli::SearchsyncConfig;
use tempfile::TempDir;

/// Config with one index over pages and a state directory.
pub const CONFIG: &str = r#"
[reindex]
batch_size = 10
max_batches_per_slice = 0
time_slice_ms = 0
retry = { max_attempts = 2, backoff = { kind = "none" } }

[[indexes]]
name = "main"
classes = ["SiteTree"]

[[indexes.fields]]
name = "Title"
"#;

/// A temporary working directory holding `config.toml` and fixtures.
pub struct Workspace {
    /// Keeps the directory alive
    pub dir: TempDir,
    /// The config file
    pub config_path: PathBuf,
}

impl Workspace {
    /// Writes [`CONFIG`] plus `state_dir` pointing inside the workspace.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let state_dir = dir.path().join("jobs").display().to_string();
        let config = CONFIG.replacen(
            "[reindex]\n",
            &format!("[reindex]\nstate_dir = {state_dir:?}\n"),
            1,
        );
        std::fs::write(&config_path, config).unwrap();
        Self { dir, config_path }
    }

    /// Loads the config with an empty environment.
    pub fn config(&self) -> SearchsyncConfig {
        SearchsyncConfig::load_with(Some(self.config_path.as_path()), |_| None).unwrap()
    }

    /// Writes a file into the workspace and returns its path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// The workspace root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Record fixture with `count` pages, odd keys published.
pub fn pages_fixture(count: u64) -> String {
    let records: Vec<serde_json::Value> = (1..=count)
        .map(|key| {
            serde_json::json!({
                "class": "Page",
                "key": key,
                "fields": { "Title": format!("Page {key}"), "published": key % 2 == 1 }
            })
        })
        .collect();
    serde_json::json!({
        "classes": {
            "SiteTree": { "capabilities": ["versioned"] },
            "Page": { "parent": "SiteTree" }
        },
        "records": records
    })
    .to_string()
}
