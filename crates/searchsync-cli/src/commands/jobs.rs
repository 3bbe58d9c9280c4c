//! `searchsync jobs`: inspect and recover persisted reindex jobs.

use std::fmt::Write as _;

use searchsync_core::{Error, JobId, Result};
use searchsync_reindex::{FileJobQueue, JobProgress, JobQueue, ReindexJobState};

/// One line per job, oldest first.
pub async fn list(queue: &FileJobQueue) -> Result<String> {
    let mut jobs = queue.list().await?;
    jobs.sort_by_key(|job| (job.created_at, job.id));
    Ok(format_jobs(&jobs))
}

/// Renders jobs as an aligned table.
pub fn format_jobs(jobs: &[ReindexJobState]) -> String {
    if jobs.is_empty() {
        return "no reindex jobs".to_string();
    }
    let width = jobs.iter().map(|job| job.index.len()).max().unwrap_or(5).max(5);
    let mut out = format!(
        "{:<36}  {:<width$}  {:<9}  {:>8}  UPDATED\n",
        "ID", "INDEX", "STATUS", "RECORDS"
    );
    for job in jobs {
        let _ = writeln!(
            out,
            "{:<36}  {:<width$}  {:<9}  {:>8}  {}",
            job.id,
            job.index,
            job.status.to_string(),
            job.counters.processed_records,
            job.updated_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    out
}

/// Full state of one job as pretty JSON.
pub async fn status(queue: &FileJobQueue, id: &JobId) -> Result<String> {
    let job = queue.load(id).await?;
    Ok(serde_json::to_string_pretty(&job)?)
}

/// Queues a failed job to continue from its frozen cursor.
///
/// The next `reindex` run picks it up.
pub async fn resume(queue: &FileJobQueue, id: &JobId) -> Result<JobProgress> {
    let mut job = queue.load(id).await?;
    job.resume()?;
    queue.enqueue(&job).await?;
    tracing::info!(job_id = %job.id, index = %job.index, "reindex job resumed");
    Ok(JobProgress::of(&job))
}

/// Breaks the claim lock of a job whose runner died.
///
/// A job left `Running` continues from its last checkpoint on the next run.
pub async fn unlock(queue: &FileJobQueue, id: &JobId) -> Result<()> {
    if queue.break_lock(id).await? {
        tracing::warn!(job_id = %id, "claim lock removed");
        Ok(())
    } else {
        Err(Error::validation(format!("job {id} is not locked")))
    }
}
