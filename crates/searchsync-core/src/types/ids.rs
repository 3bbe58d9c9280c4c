//! Identifier types for records and reindex jobs.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of a host record class (e.g. `Page`, `File`).
///
/// Classes form a single-inheritance hierarchy reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordClass(String);

impl RecordClass {
    /// Creates a record class from a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use searchsync_core::RecordClass;
    ///
    /// let class = RecordClass::new("Page");
    /// assert_eq!(class.as_str(), "Page");
    /// ```
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Returns the class name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordClass {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordClass {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RecordClass {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Primary key of a host record.
///
/// Keys are unique within a class hierarchy and enumerate in ascending order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordKey(u64);

impl RecordKey {
    /// Creates a record key.
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    /// Returns the raw key.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordKey {
    fn from(key: u64) -> Self {
        Self(key)
    }
}

impl From<RecordKey> for u64 {
    fn from(key: RecordKey) -> Self {
        key.0
    }
}

/// Unique identifier for a reindex job.
///
/// Internally represented as a UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a job ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}
