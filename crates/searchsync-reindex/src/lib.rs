//! Resumable reindex jobs for searchsync.
//!
//! A reindex job walks every record of its scoped classes in ascending key
//! order, one batch at a time, and rewrites their documents. Progress lives
//! in a [`ReindexJobState`] persisted by a [`JobQueue`], so a job survives
//! pauses, failures and process restarts and picks up from its cursor.
//!
//! - [`ReindexScheduler`]: accepts requests, dispatches slices, resumes
//! - [`ReindexRunner`]: runs one slice (batching, retries, budgets)
//! - [`MemoryJobQueue`] / [`FileJobQueue`]: where job state lives
//! - [`RecordSource`]: where records come from

pub mod config;
pub mod handle;
pub mod policy;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod source;
pub mod state;
pub mod store;


pub use config::ReindexConfig;
pub use handle::{JobHandle, JobProgress};
pub use policy::{Backoff, RetryPolicy};
pub use queue::{JobQueue, MemoryJobQueue};
pub use runner::{BatchReport, ReindexRunner};
pub use scheduler::ReindexScheduler;
pub use source::{MemoryRecordSource, RecordQuery, RecordSource, SubsiteFilter};
pub use state::{ClassCursor, JobCounters, JobStatus, ReindexJobState, ReindexScope};
pub use store::FileJobQueue;
