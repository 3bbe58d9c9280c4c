//! Handlers for `searchsync config`.

use std::path::{Path, PathBuf};

use searchsync_core::{Error, Result};

use crate::cli::ConfigAction;
use crate::config::SearchsyncConfig;

/// Dispatches a config subcommand.
pub fn handle_config_command(config_path: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path(config_path),
        ConfigAction::Show => cmd_config_show(config_path),
        ConfigAction::Init { file, force } => {
            let target = file.as_deref().or(config_path);
            cmd_config_init(target, force).map(|_| ())
        }
    }
}

/// Prints the resolved config file path.
pub fn cmd_config_path(config_path: Option<&Path>) -> Result<()> {
    let path = SearchsyncConfig::resolve_path(config_path, |key| std::env::var(key).ok())
        .ok_or_else(|| Error::config("could not determine config directory for this platform"))?;
    println!("{}", path.display());
    if !path.exists() {
        eprintln!("(file does not exist, run `searchsync config init` to create it)");
    }
    Ok(())
}

/// Prints the effective configuration, environment overrides applied.
pub fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = SearchsyncConfig::load(config_path)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Writes the starter configuration and returns where it went.
pub fn cmd_config_init(file: Option<&Path>, force: bool) -> Result<PathBuf> {
    let path = match file {
        Some(p) => p.to_path_buf(),
        None => SearchsyncConfig::default_path()
            .ok_or_else(|| Error::config("could not determine config directory"))?,
    };

    if path.exists() && !force {
        return Err(Error::config(format!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, SearchsyncConfig::sample().to_toml_string()?)?;

    println!("Config file created at {}", path.display());
    Ok(path)
}
