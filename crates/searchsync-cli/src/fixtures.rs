//! JSON fixtures standing in for a live host.
//!
//! Both fixture kinds carry a `classes` table (the host schema) next to
//! their payload:
//!
//! ```json
//! {
//!   "classes": {
//!     "SiteTree": { "capabilities": ["versioned"] },
//!     "Page": { "parent": "SiteTree" }
//!   },
//!   "records": [{ "class": "Page", "key": 1, "fields": { "Title": "Home" } }]
//! }
//! ```
//!
//! Event fixtures carry `events` instead, each tagged with `"event":
//! "written"` or `"event": "deleted"`.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use searchsync_core::{Error, Record, RecordEvent, Result, StaticHostSchema};

/// Records for a reindex run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFixture {
    /// Host class table
    #[serde(default)]
    pub classes: StaticHostSchema,

    /// Records the run walks
    #[serde(default)]
    pub records: Vec<Record>,
}

/// Lifecycle events for `apply`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFixture {
    /// Host class table
    #[serde(default)]
    pub classes: StaticHostSchema,

    /// Events in commit order
    #[serde(default)]
    pub events: Vec<RecordEvent>,
}

impl RecordFixture {
    /// Reads a record fixture.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

impl EventFixture {
    /// Reads an event fixture.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::validation(format!("invalid fixture {}: {e}", path.display())))
}
