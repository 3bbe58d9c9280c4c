//! # searchsync-cli
//!
//! Operator CLI for searchsync.
//!
//! This crate provides the `searchsync` binary and the pieces it is built
//! from:
//! - Configuration loading with environment overrides
//! - Config file management (`config path|show|init`)
//! - Engine connectivity checks (`ping`)
//! - Replaying lifecycle events through one unit of work (`apply`)
//! - Resumable reindex jobs over JSON record fixtures (`reindex`, `jobs`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod fixtures;

pub use cli::{Cli, Command, ConfigAction, JobsAction};
pub use config::SearchsyncConfig;
pub use context::Context;
