//! Job queues: where reindex job state lives between slices.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use searchsync_core::{Error, JobId, Result};

use crate::state::ReindexJobState;

/// Stores reindex jobs and hands them to runners one at a time.
///
/// A claimed job belongs to exactly one runner until it is released; only
/// the claimant writes its state.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Stores a job, replacing any earlier state with the same id.
    async fn enqueue(&self, job: &ReindexJobState) -> Result<()>;

    /// Claims the runnable job waiting longest, if any.
    async fn next_pending(&self) -> Result<Option<ReindexJobState>>;

    /// Stores a claimed job's new state and drops the claim.
    async fn release(&self, job: &ReindexJobState) -> Result<()>;

    /// Loads a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobNotFound`] for unknown ids.
    async fn load(&self, id: &JobId) -> Result<ReindexJobState>;

    /// Every job, oldest first.
    async fn list(&self) -> Result<Vec<ReindexJobState>>;
}

/// Picks the next job to claim: claimable, unclaimed, least recently touched.
///
/// Callers pass only unclaimed jobs, so a `Running` job here lost its runner.
pub(crate) fn pick_next<'a, I>(jobs: I) -> Option<&'a ReindexJobState>
where
    I: IntoIterator<Item = &'a ReindexJobState>,
{
    jobs.into_iter()
        .filter(|job| job.status.is_claimable())
        .min_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        })
}

#[derive(Debug)]
struct Entry {
    state: ReindexJobState,
    claimed: bool,
}

/// A queue held in process memory.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<BTreeMap<JobId, Entry>>,
}

impl MemoryJobQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a job is currently claimed.
    pub fn is_claimed(&self, id: &JobId) -> bool {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .is_some_and(|entry| entry.claimed)
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &ReindexJobState) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let claimed = jobs.get(&job.id).is_some_and(|entry| entry.claimed);
        jobs.insert(
            job.id,
            Entry {
                state: job.clone(),
                claimed,
            },
        );
        Ok(())
    }

    async fn next_pending(&self) -> Result<Option<ReindexJobState>> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let next = pick_next(jobs.values().filter(|e| !e.claimed).map(|e| &e.state)).map(|s| s.id);
        let Some(entry) = next.and_then(|id| jobs.get_mut(&id)) else {
            return Ok(None);
        };
        entry.state.recover_interrupted()?;
        entry.claimed = true;
        Ok(Some(entry.state.clone()))
    }

    async fn release(&self, job: &ReindexJobState) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.insert(
            job.id,
            Entry {
                state: job.clone(),
                claimed: false,
            },
        );
        Ok(())
    }

    async fn load(&self, id: &JobId) -> Result<ReindexJobState> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .map(|entry| entry.state.clone())
            .ok_or_else(|| Error::JobNotFound { id: id.to_string() })
    }

    async fn list(&self) -> Result<Vec<ReindexJobState>> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<ReindexJobState> = jobs.values().map(|e| e.state.clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}
