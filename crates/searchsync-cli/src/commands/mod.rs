//! Subcommand implementations.
//!
//! Handlers return reports; printing is left to the binary except for the
//! `config` handlers, which print as they go.

pub mod apply;
pub mod config;
pub mod jobs;
pub mod ping;
pub mod reindex;

pub use apply::{ApplyReport, apply};
pub use config::handle_config_command;
pub use ping::{PingResult, ping};
pub use reindex::{ReindexOptions, ReindexReport, reindex};
