//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use searchsync_core::JobId;

/// searchsync - keep a search index in step with CMS records
#[derive(Parser, Debug)]
#[command(name = "searchsync", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, env = "SEARCHSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or create the configuration file.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check that the engine answers for every configured index.
    Ping,

    /// Replay lifecycle events through one unit of work.
    Apply {
        /// JSON file with `classes` and `events`.
        #[arg(long)]
        events: PathBuf,

        /// Plan against in-memory indexes instead of the engine.
        #[arg(long)]
        dry_run: bool,
    },

    /// Queue and run reindex jobs over a record fixture.
    Reindex {
        /// JSON file with `classes` and `records`.
        #[arg(long)]
        records: PathBuf,

        /// Reindex only this index (default: every configured index).
        #[arg(long)]
        index: Option<String>,

        /// Restrict the job to one subsite.
        #[arg(long)]
        subsite: Option<i64>,

        /// Write to in-memory indexes and keep no job state.
        #[arg(long)]
        dry_run: bool,

        /// Concurrent job workers.
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },

    /// Inspect and recover persisted reindex jobs.
    Jobs {
        /// Jobs subcommand.
        #[command(subcommand)]
        action: JobsAction,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,

    /// Write a starter configuration file.
    Init {
        /// Target file (default: the resolved config path).
        #[arg(long)]
        file: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// `jobs` subcommands.
#[derive(Subcommand, Debug)]
pub enum JobsAction {
    /// List every stored job.
    List,

    /// Show one job's full state.
    Status {
        /// Job id.
        id: JobId,
    },

    /// Queue a failed job to continue from its cursor.
    Resume {
        /// Job id.
        id: JobId,
    },

    /// Remove the claim lock a crashed runner left behind.
    Unlock {
        /// Job id.
        id: JobId,
    },
}
