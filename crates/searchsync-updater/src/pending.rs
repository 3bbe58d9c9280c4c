//! The coalescing set of pending document operations.

use std::collections::BTreeMap;

use searchsync_core::{DocumentId, IndexDocument, PendingOp, RecordClass, RecordKey};
use searchsync_index::KeyRange;

/// Identifies the stale-scope delete of one record in one index.
type StaleKey = (String, RecordClass, RecordKey, Vec<String>);

/// At most one pending operation per document identity.
///
/// Recording an operation for an identity that already has one replaces
/// it: the last operation wins. Stale-scope range deletes coalesce the same
/// way, per record and excluded variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingWriteSet {
    ops: BTreeMap<DocumentId, PendingOp>,
    stale: BTreeMap<StaleKey, KeyRange>,
}

/// The pending operations of one index, split by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBatch {
    /// Documents to add or replace
    pub upserts: Vec<IndexDocument>,
    /// Documents to remove
    pub deletes: Vec<DocumentId>,
    /// Record documents to remove from scopes the record left
    pub stale: Vec<KeyRange>,
}

impl IndexBatch {
    /// Returns `true` if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty() && self.stale.is_empty()
    }
}

impl PendingWriteSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an operation, returning the one it replaced.
    pub fn insert(&mut self, id: DocumentId, op: PendingOp) -> Option<PendingOp> {
        self.ops.insert(id, op)
    }

    /// Records a stale-scope range delete for `index`, replacing the earlier
    /// one for the same record.
    pub fn insert_stale(&mut self, index: &str, range: KeyRange) -> Option<KeyRange> {
        self.stale.insert(Self::stale_key(index, &range), range)
    }

    /// Removes a stale-scope range delete.
    pub fn remove_stale(&mut self, index: &str, range: &KeyRange) -> Option<KeyRange> {
        self.stale.remove(&Self::stale_key(index, range))
    }

    fn stale_key(index: &str, range: &KeyRange) -> StaleKey {
        (
            index.to_string(),
            range.class.clone(),
            range.through.unwrap_or_default(),
            range.excluded.keys().cloned().collect(),
        )
    }

    /// The pending operation for `id`.
    pub fn get(&self, id: &DocumentId) -> Option<&PendingOp> {
        self.ops.get(id)
    }

    /// Number of pending operations.
    pub fn len(&self) -> usize {
        self.ops.len() + self.stale.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.stale.is_empty()
    }

    /// Pending stale-scope range deletes.
    pub fn stale(&self) -> impl Iterator<Item = &KeyRange> {
        self.stale.values()
    }

    /// Iterates pending operations by identity.
    pub fn iter(&self) -> impl Iterator<Item = (&DocumentId, &PendingOp)> {
        self.ops.iter()
    }

    /// Removes the operation for `id`.
    pub fn remove(&mut self, id: &DocumentId) -> Option<PendingOp> {
        self.ops.remove(id)
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.stale.clear();
    }

    /// Groups pending operations by index name.
    pub fn batches(&self) -> BTreeMap<String, IndexBatch> {
        let mut batches: BTreeMap<String, IndexBatch> = BTreeMap::new();
        for (id, op) in &self.ops {
            let batch = batches.entry(id.index.clone()).or_default();
            match op {
                PendingOp::Upsert(doc) => batch.upserts.push(doc.clone()),
                PendingOp::Delete => batch.deletes.push(id.clone()),
            }
        }
        for ((index, ..), range) in &self.stale {
            batches.entry(index.clone()).or_default().stale.push(range.clone());
        }
        batches
    }
}
