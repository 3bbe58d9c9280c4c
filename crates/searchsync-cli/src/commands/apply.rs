//! `searchsync apply`: replay lifecycle events as one transaction.

use std::fmt;

use searchsync_core::{RecordEvent, Result};
use searchsync_updater::FlushReport;

use crate::context::Context;

/// Outcome of one `apply` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Events recorded
    pub events: usize,
    /// Documents rejected by schema mapping
    pub rejected: usize,
    /// What the commit sent
    pub flush: FlushReport,
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "applied {} events: {} upserted, {} deleted in {} requests ({} rejected)",
            self.events, self.flush.upserted, self.flush.deleted, self.flush.requests, self.rejected
        )
    }
}

/// Records every event in one unit of work, then commits it.
///
/// # Errors
///
/// A variant error rolls the whole unit of work back; a flush error is
/// returned as is.
pub async fn apply(context: &Context, events: &[RecordEvent]) -> Result<ApplyReport> {
    let mut work = context.updater().begin();
    for event in events {
        if let Err(err) = work.record(event) {
            tracing::error!(
                class = %event.record().class,
                key = %event.record().key,
                error = %err,
                "event rejected, rolling back"
            );
            work.rollback();
            return Err(err);
        }
    }

    let events = work.events();
    let rejected = work.rejected();
    let flush = work.commit().await?;
    Ok(ApplyReport {
        events,
        rejected,
        flush,
    })
}
