//! Queued reindex jobs and the workers that run them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinSet;

use searchsync_core::{Error, JobId, Result};

use crate::handle::{JobHandle, JobProgress};
use crate::queue::JobQueue;
use crate::runner::ReindexRunner;
use crate::state::{JobStatus, ReindexJobState, ReindexScope};

/// Accepts reindex requests and dispatches queued jobs to the runner.
///
/// Jobs run one slice per dispatch; a paused job goes back to the queue
/// behind jobs that waited longer.
pub struct ReindexScheduler {
    runner: Arc<ReindexRunner>,
    queue: Arc<dyn JobQueue>,
    handles: Mutex<HashMap<JobId, JobHandle>>,
}

impl std::fmt::Debug for ReindexScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReindexScheduler")
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

impl ReindexScheduler {
    /// Creates a scheduler over `queue`.
    pub fn new(runner: ReindexRunner, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            runner: Arc::new(runner),
            queue,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// The runner executing slices.
    pub fn runner(&self) -> &Arc<ReindexRunner> {
        &self.runner
    }

    /// The job queue.
    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    /// Queues a reindex of every class `index` covers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIndex`] if no such index is registered.
    pub async fn request(&self, index: &str, subsite: Option<i64>) -> Result<JobId> {
        let writer = self.runner.indexes().get(index)?;
        let mut scope = ReindexScope::new(writer.definition().classes.clone());
        scope.subsite = subsite;
        self.request_scope(index, scope).await
    }

    /// Queues a reindex of an explicit scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIndex`] for unregistered indexes and
    /// [`Error::Validation`] for an empty scope.
    pub async fn request_scope(&self, index: &str, scope: ReindexScope) -> Result<JobId> {
        self.runner.indexes().get(index)?;
        if scope.classes.is_empty() {
            return Err(Error::validation_field("scope", "no classes to reindex"));
        }
        let job = ReindexJobState::new(index, scope);
        self.queue.enqueue(&job).await?;
        self.handle_for(&job);
        tracing::info!(
            job_id = %job.id,
            index = %job.index,
            classes = job.scope.classes.len(),
            subsite = ?job.scope.subsite,
            "reindex requested"
        );
        Ok(job.id)
    }

    /// Claims the next runnable job and runs one slice of it.
    ///
    /// Returns `None` when nothing is runnable.
    pub async fn dispatch_next(&self) -> Result<Option<(JobId, JobStatus)>> {
        let Some(mut job) = self.queue.next_pending().await? else {
            return Ok(None);
        };
        let handle = self.handle_for(&job);
        handle.publish(&job);

        let outcome = self
            .runner
            .run_slice(&mut job, self.queue.as_ref(), &handle)
            .await;
        // A slice that aborted mid-batch (a checkpoint write failed) must not
        // be stored as `Running`.
        if let Err(err) = &outcome
            && job.status == JobStatus::Running
        {
            job.fail(format!("slice aborted: {err}"))?;
        }
        // The claim is dropped whatever happened inside the slice.
        let released = self.queue.release(&job).await;
        handle.publish(&job);

        match (outcome, released) {
            (Ok(status), Ok(())) => Ok(Some((job.id, status))),
            (Err(err), _) | (Ok(_), Err(err)) => {
                tracing::error!(job_id = %job.id, error = %err, "reindex slice aborted");
                Err(err)
            }
        }
    }

    /// Dispatches slices until no job is runnable.
    ///
    /// Returns the number of slices run.
    pub async fn run_until_idle(&self) -> Result<usize> {
        let mut slices = 0;
        while self.dispatch_next().await?.is_some() {
            slices += 1;
        }
        Ok(slices)
    }

    /// Runs `workers` concurrent dispatch loops until no job is runnable.
    ///
    /// Queue claims keep two workers off the same job, so distinct jobs
    /// progress in parallel. Returns the total number of slices run.
    pub async fn run_workers(self: &Arc<Self>, workers: usize) -> Result<usize> {
        let mut set = JoinSet::new();
        for worker in 0..workers.max(1) {
            let scheduler = Arc::clone(self);
            set.spawn(async move {
                let result = scheduler.run_until_idle().await;
                tracing::debug!(worker, ok = result.is_ok(), "reindex worker idle");
                result
            });
        }

        let mut slices = 0;
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(count)) => slices += count,
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(join) => {
                    first_error.get_or_insert(Error::Io(std::io::Error::other(join)));
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(slices),
        }
    }

    /// Current state of a job.
    pub async fn status(&self, id: &JobId) -> Result<ReindexJobState> {
        self.queue.load(id).await
    }

    /// Every job, oldest first.
    pub async fn list(&self) -> Result<Vec<ReindexJobState>> {
        self.queue.list().await
    }

    /// Operator resume of a failed job.
    ///
    /// The job re-enters the queue as `Pending` with its cursors intact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the job failed.
    pub async fn resume(&self, id: &JobId) -> Result<()> {
        let mut job = self.queue.load(id).await?;
        job.resume()?;
        self.queue.enqueue(&job).await?;
        self.handle_for(&job).publish(&job);
        tracing::info!(
            job_id = %job.id,
            cursor = ?job.current_cursor().map(|(_, c)| c.last_key),
            "reindex job resumed"
        );
        Ok(())
    }

    /// Subscribes to a job's progress.
    pub async fn subscribe(&self, id: &JobId) -> Result<watch::Receiver<JobProgress>> {
        if let Some(handle) = self.handle(id) {
            return Ok(handle.subscribe());
        }
        let job = self.queue.load(id).await?;
        Ok(self.handle_for(&job).subscribe())
    }

    /// Progress handle of a job known to this scheduler.
    pub fn handle(&self, id: &JobId) -> Option<JobHandle> {
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn handle_for(&self, job: &ReindexJobState) -> JobHandle {
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(job.id)
            .or_insert_with(|| JobHandle::new(job))
            .clone()
    }
}
