//! Record enumeration for reindexing.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use searchsync_core::{Error, FieldValue, HostSchema, Record, RecordClass, RecordKey, Result};
use searchsync_index::FailurePlan;

/// Restricts a query to the records of one subsite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsiteFilter {
    /// Integer field holding the subsite (missing or null means 0)
    pub field: String,
    /// Subsite to keep
    pub subsite: i64,
}

impl SubsiteFilter {
    /// Whether `record` belongs to the subsite.
    pub fn matches(&self, record: &Record) -> bool {
        let owner = match record.field(&self.field) {
            None | Some(FieldValue::Null) => 0,
            Some(value) => match value.as_int() {
                Some(id) => id,
                None => return false,
            },
        };
        owner == self.subsite
    }
}

/// One page of records, ascending by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    /// Class to enumerate
    pub class: RecordClass,
    /// Include records of subclasses
    pub include_subclasses: bool,
    /// Only keys strictly greater than this
    pub after: Option<RecordKey>,
    /// Page size
    pub limit: usize,
    /// Optional subsite restriction
    pub subsite: Option<SubsiteFilter>,
}

/// Enumerates host records in ascending key order.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches up to `query.limit` records with keys after `query.after`.
    async fn fetch_batch(&self, query: &RecordQuery) -> Result<Vec<Record>>;

    /// Counts every record the query would reach, ignoring paging.
    async fn count(&self, query: &RecordQuery) -> Result<u64>;
}

/// In-memory records, for tests and fixture-driven CLI runs.
pub struct MemoryRecordSource {
    host: Arc<dyn HostSchema>,
    records: RwLock<BTreeMap<(RecordKey, RecordClass), Record>>,
    failures: FailurePlan<RecordQuery>,
}

impl std::fmt::Debug for MemoryRecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRecordSource")
            .field("records", &self.len())
            .finish_non_exhaustive()
    }
}

impl MemoryRecordSource {
    /// Creates an empty source resolving subclasses through `host`.
    pub fn new(host: Arc<dyn HostSchema>) -> Self {
        Self {
            host,
            records: RwLock::new(BTreeMap::new()),
            failures: FailurePlan::new(),
        }
    }

    /// Creates a source holding `records`.
    pub fn with_records(host: Arc<dyn HostSchema>, records: impl IntoIterator<Item = Record>) -> Self {
        let source = Self::new(host);
        for record in records {
            source.insert(record);
        }
        source
    }

    /// Adds or replaces a record.
    pub fn insert(&self, record: Record) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert((record.key, record.class.clone()), record);
    }

    /// Removes a record.
    pub fn remove(&self, class: &RecordClass, key: RecordKey) -> Option<Record> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.remove(&(key, class.clone()))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if the source holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Failure script applied to fetches.
    pub fn failures(&self) -> &FailurePlan<RecordQuery> {
        &self.failures
    }

    fn matches(&self, query: &RecordQuery, record: &Record) -> bool {
        let class_ok = record.class == query.class
            || (query.include_subclasses && self.host.is_subclass_of(&record.class, &query.class));
        class_ok && query.subsite.as_ref().is_none_or(|f| f.matches(record))
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn fetch_batch(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        if self.failures.should_fail(query) {
            return Err(Error::Io(std::io::Error::other(format!(
                "injected fetch failure for {} after {:?}",
                query.class, query.after
            ))));
        }
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records
            .values()
            .filter(|r| query.after.is_none_or(|after| r.key > after))
            .filter(|r| self.matches(query, r))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn count(&self, query: &RecordQuery) -> Result<u64> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.values().filter(|r| self.matches(query, r)).count() as u64)
    }
}
