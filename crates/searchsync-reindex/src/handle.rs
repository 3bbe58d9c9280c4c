//! Live progress of a reindex job.
//!
//! A [`JobHandle`] is cheap to clone and broadcasts every state the runner
//! persists through a watch channel, so callers can follow a job without
//! polling the queue.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use searchsync_core::{Error, JobId, RecordClass, RecordKey, Result};

use crate::state::{JobCounters, JobStatus, ReindexJobState};

/// Snapshot of a job's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    /// Current status
    pub status: JobStatus,
    /// Progress counters
    pub counters: JobCounters,
    /// Class being walked and its last acknowledged key
    pub cursor: Option<(RecordClass, Option<RecordKey>)>,
    /// Consecutive failures of the current batch
    pub attempts: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl JobProgress {
    /// Progress of `state`.
    pub fn of(state: &ReindexJobState) -> Self {
        Self {
            status: state.status,
            counters: state.counters,
            cursor: state
                .current_cursor()
                .map(|(_, c)| (c.class.clone(), c.last_key)),
            attempts: state.attempts,
            last_error: state.last_error.clone(),
        }
    }
}

impl fmt::Display for JobProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} records, {} documents, {} failed)",
            self.status,
            self.counters.processed_records,
            self.counters.indexed_documents,
            self.counters.failed_documents
        )?;
        if let Some((class, key)) = &self.cursor {
            match key {
                Some(key) => write!(f, " at {class}#{key}")?,
                None => write!(f, " at {class} start")?,
            }
        }
        Ok(())
    }
}

/// Observable handle on one job.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<JobHandleInner>,
}

struct JobHandleInner {
    id: JobId,
    tx: watch::Sender<JobProgress>,
}

impl JobHandle {
    /// Creates a handle starting at `state`.
    pub fn new(state: &ReindexJobState) -> Self {
        let (tx, _rx) = watch::channel(JobProgress::of(state));
        Self {
            inner: Arc::new(JobHandleInner { id: state.id, tx }),
        }
    }

    /// Job identifier.
    pub fn id(&self) -> JobId {
        self.inner.id
    }

    /// Latest progress.
    pub fn progress(&self) -> JobProgress {
        self.inner.tx.borrow().clone()
    }

    /// Publishes `state` to every subscriber.
    pub fn publish(&self, state: &ReindexJobState) {
        self.inner.tx.send_replace(JobProgress::of(state));
    }

    /// Subscribes to progress changes.
    pub fn subscribe(&self) -> watch::Receiver<JobProgress> {
        self.inner.tx.subscribe()
    }

    /// Waits until the job completes or fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `timeout` elapses first.
    pub async fn wait_terminal(&self, timeout: Duration) -> Result<JobProgress> {
        let mut rx = self.subscribe();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        {
            let progress = rx.borrow_and_update().clone();
            if progress.status.is_terminal() {
                return Ok(progress);
            }
        }

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(Error::validation(format!(
                        "job {} not finished after {timeout:?} ({})",
                        self.inner.id,
                        self.progress()
                    )));
                }
                result = rx.changed() => {
                    if result.is_err() {
                        return Ok(self.progress());
                    }
                    let progress = rx.borrow().clone();
                    if progress.status.is_terminal() {
                        return Ok(progress);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.inner.id)
            .field("progress", &self.progress())
            .finish()
    }
}
