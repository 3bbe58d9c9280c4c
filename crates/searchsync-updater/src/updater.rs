//! The search updater and its units of work.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use searchsync_core::{Record, RecordEvent, Result};
use searchsync_index::IndexSet;

use crate::pending::PendingWriteSet;
use crate::planner::DocumentPlanner;

/// Updater settings, the `[updater]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Flush when a unit of work commits. Turn off in tests to inspect
    /// pending operations without any engine traffic.
    #[serde(default = "default_flush_on_commit")]
    pub flush_on_commit: bool,

    /// Maximum documents per engine request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_flush_on_commit() -> bool {
    true
}

fn default_batch_size() -> usize {
    500
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            flush_on_commit: default_flush_on_commit(),
            batch_size: default_batch_size(),
        }
    }
}

impl UpdaterConfig {
    /// Test mode: commits discard instead of flushing.
    pub fn test_mode() -> Self {
        Self {
            flush_on_commit: false,
            ..Self::default()
        }
    }
}

/// What one flush sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Engine requests issued
    pub requests: usize,
    /// Documents upserted
    pub upserted: usize,
    /// Documents deleted
    pub deleted: usize,
    /// Stale-scope range deletes sent
    pub cleared: usize,
    /// Indexes touched
    pub indexes: usize,
}

/// Entry point for live index maintenance.
///
/// Cheap to clone; clones share the planner and the index set.
#[derive(Debug, Clone)]
pub struct SearchUpdater {
    planner: Arc<DocumentPlanner>,
    indexes: IndexSet,
    config: UpdaterConfig,
}

impl SearchUpdater {
    /// Creates an updater.
    pub fn new(planner: DocumentPlanner, indexes: IndexSet, config: UpdaterConfig) -> Self {
        Self {
            planner: Arc::new(planner),
            indexes,
            config,
        }
    }

    /// The document planner.
    pub fn planner(&self) -> &Arc<DocumentPlanner> {
        &self.planner
    }

    /// The registered indexes.
    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    /// Updater settings.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Opens a unit of work.
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork {
            updater: self.clone(),
            pending: PendingWriteSet::new(),
            events: 0,
            rejected: 0,
        }
    }
}

/// Collects document operations between `begin` and `commit`.
///
/// Recording never talks to the engine; only [`UnitOfWork::flush`] (or a
/// flushing [`UnitOfWork::commit`]) does.
#[derive(Debug)]
pub struct UnitOfWork {
    updater: SearchUpdater,
    pending: PendingWriteSet,
    events: usize,
    rejected: usize,
}

impl UnitOfWork {
    /// Records a lifecycle event.
    ///
    /// Documents failing schema mapping are logged and planned as deletes.
    ///
    /// # Errors
    ///
    /// Returns variant expansion errors. Operations recorded for other
    /// indexes before the error stay pending.
    pub fn record(&mut self, event: &RecordEvent) -> Result<()> {
        let record = event.record();
        let planner = &self.updater.planner;
        self.events += 1;

        for writer in self
            .updater
            .indexes
            .covering(&record.class, planner.host().as_ref())
        {
            let definition = writer.definition();
            if !planner.is_relevant(definition, event) {
                tracing::trace!(
                    index = %definition.name,
                    class = %record.class,
                    key = %record.key,
                    "change does not touch indexed fields"
                );
                continue;
            }

            let plan = planner.plan_event(definition, event)?;
            for err in &plan.rejected {
                tracing::warn!(index = %definition.name, error = %err, "document rejected");
            }
            self.rejected += plan.rejected.len();
            for (id, op) in plan.ops {
                self.pending.insert(id, op);
            }
            for range in plan.stale {
                self.pending.insert_stale(&definition.name, range);
            }
        }
        Ok(())
    }

    /// Records a write with unknown changed fields.
    pub fn written(&mut self, record: Record) -> Result<()> {
        self.record(&RecordEvent::written(record))
    }

    /// Records a delete.
    pub fn deleted(&mut self, record: Record) -> Result<()> {
        self.record(&RecordEvent::deleted(record))
    }

    /// Operations waiting for a flush.
    pub fn pending(&self) -> &PendingWriteSet {
        &self.pending
    }

    /// Events recorded so far.
    pub fn events(&self) -> usize {
        self.events
    }

    /// Documents rejected by schema mapping so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Sends every pending operation.
    ///
    /// Per index, upserts go in one request and deletes in another (split
    /// only when a batch exceeds `batch_size`), then one delete-by-query per
    /// record that left a scope. Operations are removed once acknowledged.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; operations not yet acknowledged
    /// stay pending so a later flush can retry them.
    pub async fn flush(&mut self) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        if self.pending.is_empty() {
            return Ok(report);
        }
        let size = self.updater.config.batch_size.max(1);

        for (index, batch) in self.pending.batches() {
            let writer = self.updater.indexes.get(&index)?;
            tracing::debug!(
                index = %index,
                upserts = batch.upserts.len(),
                deletes = batch.deletes.len(),
                "flushing search updates"
            );

            for chunk in batch.upserts.chunks(size) {
                if let Err(err) = writer.upsert(chunk).await {
                    tracing::warn!(index = %index, error = %err, "upsert failed, keeping pending");
                    return Err(err);
                }
                for doc in chunk {
                    self.pending.remove(&doc.id);
                }
                report.requests += 1;
                report.upserted += chunk.len();
            }

            for chunk in batch.deletes.chunks(size) {
                if let Err(err) = writer.delete(chunk).await {
                    tracing::warn!(index = %index, error = %err, "delete failed, keeping pending");
                    return Err(err);
                }
                for id in chunk {
                    self.pending.remove(id);
                }
                report.requests += 1;
                report.deleted += chunk.len();
            }

            for range in &batch.stale {
                if let Err(err) = writer.delete_range(range).await {
                    tracing::warn!(
                        index = %index,
                        error = %err,
                        "stale scope delete failed, keeping pending"
                    );
                    return Err(err);
                }
                self.pending.remove_stale(&index, range);
                report.requests += 1;
                report.cleared += 1;
            }
            report.indexes += 1;
        }

        tracing::info!(
            requests = report.requests,
            upserted = report.upserted,
            deleted = report.deleted,
            cleared = report.cleared,
            "search updates flushed"
        );
        Ok(report)
    }

    /// Ends the unit of work.
    ///
    /// Flushes once when `flush_on_commit` is on; otherwise discards the
    /// pending operations.
    pub async fn commit(mut self) -> Result<FlushReport> {
        if self.updater.config.flush_on_commit {
            let result = self.flush().await;
            if result.is_err() {
                tracing::error!(
                    pending = self.pending.len(),
                    "search flush failed at commit, pending updates lost"
                );
                self.pending.clear();
            }
            result
        } else {
            tracing::debug!(
                pending = self.pending.len(),
                "flush on commit disabled, discarding search updates"
            );
            self.pending.clear();
            Ok(FlushReport::default())
        }
    }

    /// Ends the unit of work without sending anything.
    pub fn rollback(mut self) {
        tracing::debug!(pending = self.pending.len(), "search updates rolled back");
        self.pending.clear();
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(
                pending = self.pending.len(),
                "unit of work dropped with unflushed search updates"
            );
        }
    }
}
