//! Reindex job state and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use searchsync_core::{Error, JobId, RecordClass, RecordKey, Result};
use searchsync_index::IndexedClass;

/// Lifecycle status of a reindex job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not yet claimed.
    Pending,

    /// Claimed by a runner and processing batches.
    ///
    /// Found unclaimed, the runner died mid-slice; the next claim recovers
    /// the job from its last checkpoint.
    Running,

    /// Slice budget exhausted; queued to continue from its cursor.
    Paused,

    /// Every scoped class processed.
    Completed,

    /// Stopped on an error; needs an explicit resume.
    Failed,
}

impl JobStatus {
    /// Returns `true` if the job will not run again without intervention.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns `true` if a runner may claim the job.
    pub fn is_runnable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Paused)
    }

    /// Returns `true` if an unclaimed job in this status may be claimed.
    pub fn is_claimable(&self) -> bool {
        self.is_runnable() || *self == JobStatus::Running
    }

    /// Whether the state machine allows `self -> next`.
    ///
    /// `Failed -> Pending` is not listed; only an operator resume does it.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Paused, Running)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Failed)
                | (Pending, Failed)
                | (Paused, Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Paused => write!(f, "paused"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What a job reindexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexScope {
    /// Classes to walk, in order
    pub classes: Vec<IndexedClass>,

    /// Restrict to one subsite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsite: Option<i64>,
}

impl ReindexScope {
    /// A scope over the given classes, all subsites.
    pub fn new(classes: Vec<IndexedClass>) -> Self {
        Self {
            classes,
            subsite: None,
        }
    }

    /// Restricts the scope to one subsite.
    pub fn with_subsite(mut self, subsite: i64) -> Self {
        self.subsite = Some(subsite);
        self
    }
}

/// Progress through one scoped class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCursor {
    /// Class being walked
    pub class: RecordClass,

    /// Whether subclasses are walked too
    pub include_subclasses: bool,

    /// Last key whose batch was acknowledged
    #[serde(default)]
    pub last_key: Option<RecordKey>,

    /// Whether the class is finished
    #[serde(default)]
    pub done: bool,
}

impl ClassCursor {
    fn start(indexed: &IndexedClass) -> Self {
        Self {
            class: indexed.class.clone(),
            include_subclasses: indexed.include_subclasses,
            last_key: None,
            done: false,
        }
    }
}

/// Job counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    /// Records read from the source
    pub processed_records: u64,
    /// Documents upserted
    pub indexed_documents: u64,
    /// Documents rejected by schema mapping
    pub failed_documents: u64,
    /// Batches acknowledged
    pub completed_batches: u64,
}

/// Persistent state of one reindex job.
///
/// Serialized as JSON by the job queues and kept after completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexJobState {
    /// Job identifier
    pub id: JobId,

    /// Target index name
    pub index: String,

    /// What to reindex
    pub scope: ReindexScope,

    /// Current status
    pub status: JobStatus,

    /// One cursor per scoped class, in scope order
    pub cursors: Vec<ClassCursor>,

    /// Progress counters
    #[serde(default)]
    pub counters: JobCounters,

    /// Consecutive failed attempts of the current batch
    #[serde(default)]
    pub attempts: u32,

    /// Last error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// Slices run so far
    #[serde(default)]
    pub slices: u32,

    /// When the job was requested
    pub created_at: DateTime<Utc>,

    /// Last state change
    pub updated_at: DateTime<Utc>,
}

impl ReindexJobState {
    /// Creates a pending job with fresh cursors.
    pub fn new(index: impl Into<String>, scope: ReindexScope) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            index: index.into(),
            cursors: scope.classes.iter().map(ClassCursor::start).collect(),
            scope,
            status: JobStatus::Pending,
            counters: JobCounters::default(),
            attempts: 0,
            last_error: None,
            slices: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks that the cursors are consistent with the scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobStateCorruption`] if there are no cursors, they
    /// do not line up with the scoped classes, or a finished class follows
    /// an unfinished one.
    pub fn validate(&self) -> Result<()> {
        let job = self.id.to_string();
        if self.cursors.is_empty() {
            return Err(Error::corruption(job, "job has no class cursors"));
        }
        if self.cursors.len() != self.scope.classes.len() {
            return Err(Error::corruption(
                job,
                format!(
                    "{} cursors for {} scoped classes",
                    self.cursors.len(),
                    self.scope.classes.len()
                ),
            ));
        }
        for (cursor, scoped) in self.cursors.iter().zip(&self.scope.classes) {
            if cursor.class != scoped.class {
                return Err(Error::corruption(
                    job,
                    format!(
                        "cursor for {} where scope lists {}",
                        cursor.class, scoped.class
                    ),
                ));
            }
        }
        if let Some(open) = self.cursors.iter().position(|c| !c.done)
            && self.cursors[open..].iter().any(|c| c.done)
        {
            return Err(Error::corruption(
                job,
                "a finished class follows an unfinished one",
            ));
        }
        if self.status == JobStatus::Completed && !self.is_finished() {
            return Err(Error::corruption(job, "completed job with open cursors"));
        }
        Ok(())
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if the state machine forbids it.
    pub fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(job_id = %self.id, from = %self.status, to = %next, "job transition");
        self.status = next;
        self.touch();
        Ok(())
    }

    /// Records an error and moves to `Failed`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.last_error = Some(message.into());
        self.transition(JobStatus::Failed)
    }

    /// Operator resume: `Failed -> Pending`, keeping the cursors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the job failed.
    pub fn resume(&mut self) -> Result<()> {
        if self.status != JobStatus::Failed {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: JobStatus::Pending.to_string(),
            });
        }
        self.status = JobStatus::Pending;
        self.attempts = 0;
        self.touch();
        Ok(())
    }

    /// Pauses a job whose runner died mid-slice.
    ///
    /// The cursor is the last checkpoint, so the batch in flight when the
    /// runner died is processed again. Returns `true` if the job was
    /// recovered.
    pub fn recover_interrupted(&mut self) -> Result<bool> {
        if self.status != JobStatus::Running {
            return Ok(false);
        }
        tracing::warn!(
            job_id = %self.id,
            index = %self.index,
            processed = self.counters.processed_records,
            "recovering interrupted job from its last checkpoint"
        );
        self.transition(JobStatus::Paused)?;
        Ok(true)
    }

    /// Index and cursor of the first unfinished class.
    pub fn current_cursor(&self) -> Option<(usize, &ClassCursor)> {
        self.cursors.iter().enumerate().find(|(_, c)| !c.done)
    }

    /// Returns `true` once every class is finished.
    pub fn is_finished(&self) -> bool {
        self.cursors.iter().all(|c| c.done)
    }

    /// Bumps `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
