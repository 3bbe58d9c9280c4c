//! Runs reindex jobs one time slice at a time.

use std::sync::Arc;

use tokio::time::Instant;

use searchsync_core::{
    PendingOp, RecordKey, Result, SearchLogFactory, SearchLogger, TracingLogFactory,
};
use searchsync_index::{IndexSet, IndexWriter, KeyRange};
use searchsync_updater::{DocumentPlanner, PlanMode};
use searchsync_variants::SubsiteVariant;
use searchsync_variants::subsites::DEFAULT_SUBSITE_FIELD;

use crate::config::ReindexConfig;
use crate::handle::JobHandle;
use crate::queue::JobQueue;
use crate::source::{RecordQuery, RecordSource, SubsiteFilter};
use crate::state::{ClassCursor, JobStatus, ReindexJobState};

/// Outcome of one acknowledged batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records fetched
    pub records: usize,
    /// Documents upserted
    pub upserted: usize,
    /// Documents rejected by schema mapping
    pub rejected: usize,
    /// Whether the batch closed its class
    pub closed_class: bool,
}

/// Walks a job's classes in batches and writes their documents.
pub struct ReindexRunner {
    source: Arc<dyn RecordSource>,
    indexes: IndexSet,
    planner: Arc<DocumentPlanner>,
    config: ReindexConfig,
    logs: Arc<dyn SearchLogFactory>,
}

impl std::fmt::Debug for ReindexRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReindexRunner")
            .field("indexes", &self.indexes.names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReindexRunner {
    /// Creates a runner logging through `tracing`.
    pub fn new(
        source: Arc<dyn RecordSource>,
        indexes: IndexSet,
        planner: Arc<DocumentPlanner>,
        config: ReindexConfig,
    ) -> Self {
        Self {
            source,
            indexes,
            planner,
            config,
            logs: Arc::new(TracingLogFactory),
        }
    }

    /// Replaces the log factory.
    pub fn with_logs(mut self, logs: Arc<dyn SearchLogFactory>) -> Self {
        self.logs = logs;
        self
    }

    /// Runner settings.
    pub fn config(&self) -> &ReindexConfig {
        &self.config
    }

    /// The indexes jobs may target.
    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    /// The document planner.
    pub fn planner(&self) -> &Arc<DocumentPlanner> {
        &self.planner
    }

    /// Runs one slice of a claimed job.
    ///
    /// The job ends the slice `Paused` (budget spent), `Completed` or
    /// `Failed`. After every acknowledged batch the state is checkpointed
    /// through `queue` and published on `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`searchsync_core::Error::InvalidTransition`] if the job is not
    /// runnable, and any checkpoint error from `queue`. Batch errors never
    /// escape; they are retried or recorded on the job.
    pub async fn run_slice(
        &self,
        job: &mut ReindexJobState,
        queue: &dyn JobQueue,
        handle: &JobHandle,
    ) -> Result<JobStatus> {
        let logger = self.logs.job_logger(&job.id, &job.index);

        if let Err(err) = job.validate() {
            logger.error(format!("refusing to run: {err}"));
            job.fail(err.to_string())?;
            handle.publish(job);
            return Ok(job.status);
        }
        let writer = match self.indexes.get(&job.index) {
            Ok(writer) => writer,
            Err(err) => {
                logger.error(format!("refusing to run: {err}"));
                job.fail(err.to_string())?;
                handle.publish(job);
                return Ok(job.status);
            }
        };

        job.transition(JobStatus::Running)?;
        job.slices += 1;
        handle.publish(job);
        logger.info(format!(
            "slice {} started ({} records processed so far)",
            job.slices, job.counters.processed_records
        ));

        let started = Instant::now();
        let mut batches = 0u32;
        loop {
            let Some((position, _)) = job.current_cursor() else {
                job.transition(JobStatus::Completed)?;
                logger.info(format!(
                    "completed: {} records, {} documents, {} rejected",
                    job.counters.processed_records,
                    job.counters.indexed_documents,
                    job.counters.failed_documents
                ));
                break;
            };

            if batches > 0 && self.budget_spent(batches, started) {
                job.transition(JobStatus::Paused)?;
                logger.info(format!("slice budget spent after {batches} batches, pausing"));
                break;
            }

            match self.run_batch(job, position, writer.as_ref(), &logger).await {
                Ok(_) => {
                    batches += 1;
                    job.attempts = 0;
                    job.touch();
                    queue.enqueue(job).await?;
                }
                Err(err) if err.is_retryable() => {
                    job.attempts += 1;
                    job.last_error = Some(err.to_string());
                    let policy = &self.config.retry;
                    if policy.is_exhausted(job.attempts) {
                        logger.error(format!(
                            "batch failed {} times, giving up: {err}",
                            job.attempts
                        ));
                        job.transition(JobStatus::Failed)?;
                        break;
                    }
                    let delay = policy.delay_after(job.attempts);
                    logger.warn(format!(
                        "batch failed (attempt {}/{}), retrying in {delay:?}: {err}",
                        job.attempts, policy.max_attempts
                    ));
                    handle.publish(job);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    logger.error(format!("batch failed permanently: {err}"));
                    job.fail(err.to_string())?;
                    break;
                }
            }
            handle.publish(job);
        }

        handle.publish(job);
        tracing::info!(
            job_id = %job.id,
            index = %job.index,
            status = %job.status,
            batches,
            "reindex slice finished"
        );
        Ok(job.status)
    }

    fn budget_spent(&self, batches: u32, started: Instant) -> bool {
        self.config.batch_budget().is_some_and(|max| batches >= max)
            || self
                .config
                .time_slice()
                .is_some_and(|slice| started.elapsed() >= slice)
    }

    /// Processes the batch after the cursor at `position`.
    ///
    /// The cursor and counters move only when every engine call succeeded,
    /// so a failed batch is retried from the same key.
    async fn run_batch(
        &self,
        job: &mut ReindexJobState,
        position: usize,
        writer: &dyn IndexWriter,
        logger: &SearchLogger,
    ) -> Result<BatchReport> {
        let cursor = job.cursors[position].clone();
        let query = RecordQuery {
            class: cursor.class.clone(),
            include_subclasses: cursor.include_subclasses,
            after: cursor.last_key,
            limit: self.config.batch_size.max(1),
            subsite: job.scope.subsite.map(|subsite| SubsiteFilter {
                field: self.subsite_field(),
                subsite,
            }),
        };
        logger.debug(format!(
            "batch start: {} after {} (limit {})",
            cursor.class,
            describe_key(cursor.last_key),
            query.limit
        ));

        let records = self.source.fetch_batch(&query).await?;
        let Some(last) = records.last().map(|r| r.key) else {
            if let Some(tail) = self.stale_range(&cursor, None, job.scope.subsite) {
                logger.debug(format!("class exhausted, removing {tail} [{}]", tail.to_query()));
                writer.delete_range(&tail).await?;
            }
            job.cursors[position].done = true;
            logger.info(format!("class {} finished", cursor.class));
            return Ok(BatchReport {
                closed_class: true,
                ..BatchReport::default()
            });
        };

        let range = self.stale_range(&cursor, Some(last), job.scope.subsite);
        if let Some(range) = &range {
            writer.delete_range(range).await?;
        }

        let definition = writer.definition();
        let mut documents = Vec::new();
        let mut rejected = 0;
        for record in &records {
            let plan = self.planner.plan(definition, record, PlanMode::Write)?;
            for err in &plan.rejected {
                logger.warn(format!("document rejected: {err}"));
            }
            rejected += plan.rejected.len();
            documents.extend(plan.ops.into_iter().filter_map(|(_, op)| match op {
                PendingOp::Upsert(doc) => Some(doc),
                PendingOp::Delete => None,
            }));
        }
        writer.upsert(&documents).await?;

        let report = BatchReport {
            records: records.len(),
            upserted: documents.len(),
            rejected,
            closed_class: false,
        };
        job.cursors[position].last_key = Some(last);
        job.counters.processed_records += report.records as u64;
        job.counters.indexed_documents += report.upserted as u64;
        job.counters.failed_documents += report.rejected as u64;
        job.counters.completed_batches += 1;
        logger.info(format!(
            "batch done: {}({}, {last}] [{}], {} records, {} documents, {} rejected",
            cursor.class,
            describe_key(cursor.last_key),
            range.map(|r| r.to_query()).unwrap_or_default(),
            report.records,
            report.upserted,
            report.rejected
        ));
        Ok(report)
    }

    /// Documents of `cursor`'s class between the cursor and `through`.
    ///
    /// A subsite job only clears documents tagged with its subsite. When the
    /// class is not split by subsite its documents carry no tag, so nothing
    /// is cleared: other subsites' records in the range are never fetched
    /// and must keep their documents.
    fn stale_range(
        &self,
        cursor: &ClassCursor,
        through: Option<RecordKey>,
        subsite: Option<i64>,
    ) -> Option<KeyRange> {
        let range = KeyRange::all(cursor.class.clone(), cursor.include_subclasses)
            .after(cursor.last_key)
            .through(through);
        match subsite {
            None => Some(range),
            Some(subsite) if self.splits_by_subsite(cursor) => {
                Some(range.with_variant(SubsiteVariant::NAME, subsite.to_string()))
            }
            Some(_) => None,
        }
    }

    /// The field the registered subsite variant reads, so jobs select the
    /// same records the variant tags.
    fn subsite_field(&self) -> String {
        self.planner
            .variants()
            .strategy(SubsiteVariant::NAME)
            .and_then(|v| v.tracked_fields().into_iter().next())
            .unwrap_or_else(|| DEFAULT_SUBSITE_FIELD.to_string())
    }

    fn splits_by_subsite(&self, cursor: &ClassCursor) -> bool {
        self.planner
            .variants()
            .variants_for(&cursor.class)
            .iter()
            .any(|v| v.name() == SubsiteVariant::NAME)
    }
}

fn describe_key(key: Option<RecordKey>) -> String {
    key.map(|k| k.to_string())
        .unwrap_or_else(|| "start".to_string())
}
