//! Live search index maintenance for searchsync.
//!
//! Record lifecycle events are recorded into a [`UnitOfWork`], which
//! coalesces them into at most one pending operation per document and
//! sends them to the index writers in a single flush.
//!
//! ```no_run
//! # async fn example(updater: searchsync_updater::SearchUpdater) -> searchsync_core::Result<()> {
//! use searchsync_core::Record;
//!
//! let mut unit = updater.begin();
//! unit.written(Record::new("Page", 1).with_field("Title", "Home"))?;
//! unit.deleted(Record::new("Page", 2))?;
//! unit.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod pending;
pub mod planner;
pub mod updater;


pub use pending::{IndexBatch, PendingWriteSet};
pub use planner::{DocumentPlan, DocumentPlanner, PlanMode};
pub use updater::{FlushReport, SearchUpdater, UnitOfWork, UpdaterConfig};
