//! File-backed job queue.
//!
//! Layout of the state directory:
//!
//! - `<id>.json`: job state, replaced atomically (temp file + rename)
//! - `<id>.lock`: present while a runner holds the claim
//! - `<id>.json.corrupt`: a state file that could not be read, kept for
//!   inspection
//!
//! Claims are taken with exclusive file creation, so several processes can
//! share one directory without running the same job twice.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use searchsync_core::{Error, JobId, Result};

use crate::queue::{JobQueue, pick_next};
use crate::state::ReindexJobState;

const STATE_EXT: &str = "json";
const LOCK_EXT: &str = "lock";
const CORRUPT_SUFFIX: &str = ".corrupt";

/// Job queue persisting one JSON file per job.
#[derive(Debug, Clone)]
pub struct FileJobQueue {
    dir: PathBuf,
}

impl FileJobQueue {
    /// Opens (and creates if needed) a queue in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Removes a stale claim left by a runner that died.
    ///
    /// Returns `true` if a lock was removed. A job the dead runner left
    /// `Running` is picked up again by the next claim.
    pub async fn break_lock(&self, id: &JobId) -> Result<bool> {
        match fs::remove_file(self.lock_path(id)).await {
            Ok(()) => {
                tracing::warn!(job_id = %id, "stale job claim removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a job is currently claimed.
    pub async fn is_claimed(&self, id: &JobId) -> Result<bool> {
        Ok(fs::try_exists(self.lock_path(id)).await?)
    }

    fn state_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.{STATE_EXT}"))
    }

    fn lock_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.{LOCK_EXT}"))
    }

    fn corrupt_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(CORRUPT_SUFFIX);
        PathBuf::from(name)
    }

    async fn write_state(&self, job: &ReindexJobState) -> Result<()> {
        let path = self.state_path(&job.id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(job)?;
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Reads one state file, quarantining it when unreadable.
    async fn read_state(&self, path: &Path) -> Result<ReindexJobState> {
        let content = fs::read(path).await?;
        match serde_json::from_slice::<ReindexJobState>(&content) {
            Ok(job) => Ok(job),
            Err(e) => {
                let target = Self::corrupt_path(path);
                tracing::error!(
                    path = %path.display(),
                    quarantined = %target.display(),
                    error = %e,
                    "unreadable job state"
                );
                fs::rename(path, &target).await?;
                Err(Error::corruption(
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    format!("unreadable state file: {e}"),
                ))
            }
        }
    }

    /// Every readable job in the directory.
    async fn read_all(&self) -> Result<Vec<ReindexJobState>> {
        let mut jobs = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STATE_EXT) {
                continue;
            }
            match self.read_state(&path).await {
                Ok(job) => jobs.push(job),
                Err(Error::JobStateCorruption { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(jobs)
    }

    async fn try_claim(&self, id: &JobId) -> Result<bool> {
        let opened = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.lock_path(id))
            .await;
        match opened {
            Ok(mut file) => {
                file.write_all(format!("{}\n", std::process::id()).as_bytes())
                    .await?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn drop_claim(&self, id: &JobId) -> Result<()> {
        match fs::remove_file(self.lock_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a freshly claimed job, giving the claim back if that fails.
    async fn read_claimed(&self, id: &JobId) -> Result<ReindexJobState> {
        let read = async {
            let mut job = self.read_state(&self.state_path(id)).await?;
            if job.recover_interrupted()? {
                self.write_state(&job).await?;
            }
            Ok::<_, Error>(job)
        };
        let job = read.await;
        if job.is_err()
            && let Err(e) = self.drop_claim(id).await
        {
            tracing::warn!(job_id = %id, error = %e, "could not remove job claim");
        }
        job
    }
}

#[async_trait]
impl JobQueue for FileJobQueue {
    async fn enqueue(&self, job: &ReindexJobState) -> Result<()> {
        self.write_state(job).await
    }

    async fn next_pending(&self) -> Result<Option<ReindexJobState>> {
        let mut candidates = Vec::new();
        for job in self.read_all().await? {
            if !self.is_claimed(&job.id).await? {
                candidates.push(job);
            }
        }

        // Another process may win a claim between the scan and the lock.
        while let Some(next) = pick_next(&candidates).map(|job| job.id) {
            if self.try_claim(&next).await? {
                return self.read_claimed(&next).await.map(Some);
            }
            candidates.retain(|job| job.id != next);
        }
        Ok(None)
    }

    async fn release(&self, job: &ReindexJobState) -> Result<()> {
        self.write_state(job).await?;
        self.drop_claim(&job.id).await
    }

    async fn load(&self, id: &JobId) -> Result<ReindexJobState> {
        let path = self.state_path(id);
        if fs::try_exists(&path).await? {
            return self.read_state(&path).await;
        }
        if fs::try_exists(Self::corrupt_path(&path)).await? {
            return Err(Error::corruption(
                id.to_string(),
                "state file was quarantined as unreadable",
            ));
        }
        Err(Error::JobNotFound { id: id.to_string() })
    }

    async fn list(&self) -> Result<Vec<ReindexJobState>> {
        let mut jobs = self.read_all().await?;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }
}
