//! dw - stream directory change events to stdout
//!
//! Thin demo surface over the `watcher` crate: watches one directory and
//! prints a colored line per event until stdin reaches EOF or an empty
//! line.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use watcher::{BackendMode, ChangeKind, DirWatcher, WatchConfig};

/// Watch a directory and print one line per change event
#[derive(Parser)]
#[command(name = "dw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to watch
    path: PathBuf,

    /// Force the polling backend (useful on network filesystems)
    #[arg(long)]
    poll: bool,

    /// Poll interval in milliseconds (polling backend only)
    #[arg(long, default_value = "100")]
    interval_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = WatchConfig {
        backend: if cli.poll {
            BackendMode::Poll
        } else {
            BackendMode::Auto
        },
        poll_interval_ms: cli.interval_ms,
    };

    let watcher = DirWatcher::with_config(&cli.path, config, |kind, path| {
        let tag = match kind {
            ChangeKind::Created => "created".green().to_string(),
            ChangeKind::Changed => "changed".yellow().to_string(),
            ChangeKind::Deleted => "deleted".red().to_string(),
        };
        println!("{tag}  {}", path.display());
    })
    .with_context(|| format!("{} is not a directory", cli.path.display()))?;

    if !watcher.start() {
        bail!("failed to start watching {}", cli.path.display());
    }

    eprintln!(
        "{}",
        format!("watching {} - press Enter to stop", cli.path.display()).dimmed()
    );

    for line in std::io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            break;
        }
    }

    watcher.stop();
    Ok(())
}
