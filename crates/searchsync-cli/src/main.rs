//! searchsync CLI
//!
//! Command-line interface for searchsync index maintenance.

#![forbid(unsafe_code)]

use anyhow::{Context as _, Result, bail};
use clap::Parser;

use searchsync_core::StaticHostSchema;
use searchsync_index::IndexWriter;

use searchsync_cli::commands::{self, ReindexOptions, jobs};
use searchsync_cli::context::{self, Context, Target};
use searchsync_cli::fixtures::{EventFixture, RecordFixture};
use searchsync_cli::{Cli, Command, JobsAction, SearchsyncConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,searchsync=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Config { action } => {
            commands::handle_config_command(config_path, action)?;
            Ok(())
        }
        Command::Ping => {
            let config = SearchsyncConfig::load(config_path)?;
            let context = Context::new(config, StaticHostSchema::new(), Target::http())?;
            let results = commands::ping(&context).await?;
            for result in &results {
                println!("{result}");
            }
            if results.iter().any(|r| r.error.is_some()) {
                bail!("search engine unreachable");
            }
            Ok(())
        }
        Command::Apply { events, dry_run } => {
            let config = SearchsyncConfig::load(config_path)?;
            let fixture = EventFixture::load(&events)
                .with_context(|| format!("loading events from {}", events.display()))?;
            let target = if dry_run { Target::Memory } else { Target::http() };
            let context = Context::new(config, fixture.classes, target)?;
            let report = commands::apply(&context, &fixture.events).await?;
            println!("{report}");
            for index in context.memory() {
                println!("{}: {} documents", index.name(), index.len());
            }
            Ok(())
        }
        Command::Reindex {
            records,
            index,
            subsite,
            dry_run,
            workers,
        } => {
            let config = SearchsyncConfig::load(config_path)?;
            let fixture = RecordFixture::load(&records)
                .with_context(|| format!("loading records from {}", records.display()))?;
            let queue = context::open_queue(&config, dry_run)?;
            let target = if dry_run { Target::Memory } else { Target::http() };
            let context = Context::new(config, fixture.classes, target)?;

            let options = ReindexOptions {
                index,
                subsite,
                workers: workers.max(1),
            };
            let report = commands::reindex(&context, fixture.records, queue, options).await?;
            println!("{report}");
            for index in context.memory() {
                println!("{}: {} documents", index.name(), index.len());
            }

            let failed = report.failed();
            if !failed.is_empty() {
                bail!(
                    "{} reindex job(s) failed; fix the cause and run `searchsync jobs resume <ID>`",
                    failed.len()
                );
            }
            Ok(())
        }
        Command::Jobs { action } => {
            let config = SearchsyncConfig::load(config_path)?;
            let queue = context::persistent_queue(&config)?;
            match action {
                JobsAction::List => println!("{}", jobs::list(&queue).await?),
                JobsAction::Status { id } => println!("{}", jobs::status(&queue, &id).await?),
                JobsAction::Resume { id } => {
                    let progress = jobs::resume(&queue, &id).await?;
                    println!("{id}: {progress}");
                }
                JobsAction::Unlock { id } => {
                    jobs::unlock(&queue, &id).await?;
                    println!("{id}: unlocked");
                }
            }
            Ok(())
        }
    }
}
