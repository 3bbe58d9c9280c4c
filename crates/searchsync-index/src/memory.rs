//! An in-memory index writer for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use searchsync_core::{DocumentId, Error, IndexDocument, Result, TransportError};

use crate::definition::IndexDefinition;
use crate::failure::FailurePlan;
use crate::writer::{IndexWriter, KeyRange};

/// One operation applied to a [`RecordingIndex`].
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    /// Documents added or replaced
    Upsert(Vec<DocumentId>),
    /// Documents removed by identity
    Delete(Vec<DocumentId>),
    /// Documents removed by key range
    DeleteRange(KeyRange),
}

impl IndexOp {
    /// Short label for logs and assertions.
    pub fn label(&self) -> &'static str {
        match self {
            IndexOp::Upsert(_) => "upsert",
            IndexOp::Delete(_) => "delete",
            IndexOp::DeleteRange(_) => "delete_range",
        }
    }
}

/// Captures operations and keeps the resulting documents in memory.
///
/// Scripted failures reject an operation before it touches the store, the
/// way a failed request leaves the engine unchanged.
#[derive(Debug)]
pub struct RecordingIndex {
    definition: IndexDefinition,
    ops: Mutex<Vec<IndexOp>>,
    store: Mutex<BTreeMap<DocumentId, IndexDocument>>,
    failures: FailurePlan<IndexOp>,
}

impl RecordingIndex {
    /// Creates an empty index for `definition`.
    pub fn new(definition: IndexDefinition) -> Self {
        Self {
            definition,
            ops: Mutex::new(Vec::new()),
            store: Mutex::new(BTreeMap::new()),
            failures: FailurePlan::new(),
        }
    }

    /// Failure script applied to incoming operations.
    pub fn failures(&self) -> &FailurePlan<IndexOp> {
        &self.failures
    }

    /// Successfully applied operations, oldest first.
    pub fn ops(&self) -> Vec<IndexOp> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successfully applied operations.
    pub fn op_count(&self) -> usize {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Forgets the operation log, keeping the documents.
    pub fn clear_ops(&self) {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Current documents, ordered by identity.
    pub fn documents(&self) -> Vec<IndexDocument> {
        self.store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Looks up a document.
    pub fn document(&self, id: &DocumentId) -> Option<IndexDocument> {
        self.store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.store.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if no document is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn admit(&self, op: IndexOp) -> Result<()> {
        if self.failures.should_fail(&op) {
            return Err(Error::Transport(TransportError::status(
                503,
                format!("memory://{}", self.definition.name),
                format!("injected {} failure", op.label()),
            )));
        }
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).push(op);
        Ok(())
    }
}

#[async_trait]
impl IndexWriter for RecordingIndex {
    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    async fn upsert(&self, documents: &[IndexDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        self.admit(IndexOp::Upsert(
            documents.iter().map(|d| d.id.clone()).collect(),
        ))?;
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        for doc in documents {
            store.insert(doc.id.clone(), doc.clone());
        }
        Ok(())
    }

    async fn delete(&self, ids: &[DocumentId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.admit(IndexOp::Delete(ids.to_vec()))?;
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }

    async fn delete_range(&self, range: &KeyRange) -> Result<()> {
        self.admit(IndexOp::DeleteRange(range.clone()))?;
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store.retain(|_, doc| !range.contains(doc));
        Ok(())
    }
}
