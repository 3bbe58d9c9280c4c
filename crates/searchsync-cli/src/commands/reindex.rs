//! `searchsync reindex`: queue and run reindex jobs over a record fixture.

use std::fmt;
use std::sync::Arc;

use searchsync_core::{Record, Result};
use searchsync_reindex::{JobProgress, JobQueue, JobStatus, MemoryRecordSource, ReindexJobState};

use crate::context::Context;

/// What to reindex.
#[derive(Debug, Clone, Default)]
pub struct ReindexOptions {
    /// Single index, or every configured index when `None`
    pub index: Option<String>,
    /// Restrict the jobs to one subsite
    pub subsite: Option<i64>,
    /// Concurrent workers (at least one)
    pub workers: usize,
}

/// Outcome of one `reindex` run.
#[derive(Debug, Clone)]
pub struct ReindexReport {
    /// Final state of the jobs this run requested
    pub jobs: Vec<ReindexJobState>,
    /// Slices run, including slices of jobs queued earlier
    pub slices: usize,
}

impl ReindexReport {
    /// Jobs that ended in [`JobStatus::Failed`].
    pub fn failed(&self) -> Vec<&ReindexJobState> {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Failed)
            .collect()
    }
}

impl fmt::Display for ReindexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for job in &self.jobs {
            writeln!(f, "{} {}: {}", job.id, job.index, JobProgress::of(job))?;
            if let Some(err) = &job.last_error {
                writeln!(f, "    last error: {err}")?;
            }
        }
        write!(f, "{} slices run", self.slices)
    }
}

/// Requests one job per target index and runs the queue until it is idle.
///
/// Jobs already waiting in `queue` (paused, or resumed by an operator) run
/// in the same pass.
pub async fn reindex(
    context: &Context,
    records: Vec<Record>,
    queue: Arc<dyn JobQueue>,
    options: ReindexOptions,
) -> Result<ReindexReport> {
    let source = Arc::new(MemoryRecordSource::with_records(
        context.host().clone(),
        records,
    ));
    let scheduler = Arc::new(context.scheduler(source, queue));

    let targets = match options.index {
        Some(index) => vec![index],
        None => context.indexes().names(),
    };
    let mut ids = Vec::with_capacity(targets.len());
    for index in &targets {
        ids.push(scheduler.request(index, options.subsite).await?);
    }

    let slices = if options.workers > 1 {
        scheduler.run_workers(options.workers).await?
    } else {
        scheduler.run_until_idle().await?
    };

    let mut jobs = Vec::with_capacity(ids.len());
    for id in &ids {
        jobs.push(scheduler.status(id).await?);
    }
    tracing::info!(jobs = jobs.len(), slices, "reindex run finished");
    Ok(ReindexReport { jobs, slices })
}
