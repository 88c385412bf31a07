//! earncache - local cache of earnings events and analyst snapshots
//!
//! Opens the cache database, runs one subcommand against it and prints the
//! result as text or JSON.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use earnings_cache::cache::CacheManager;
use earnings_cache::cli::{Cli, Command};
use earnings_cache::config::CacheConfig;
use earnings_cache::maintenance::{MaintenanceConfig, MaintenanceHandle, MaintenanceMessage};
use earnings_cache::synthetic::SeedOptions;
use earnings_cache::{output, synthetic};

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn watch(cache: CacheManager, interval_secs: u64) -> Result<()> {
    let config = MaintenanceConfig {
        sweep_interval: Duration::from_secs(interval_secs.max(1)),
        enabled: true,
    };
    let mut handle = MaintenanceHandle::spawn(cache, config);
    info!(interval_secs, "watching cache; press Ctrl-C to stop");

    loop {
        tokio::select! {
            msg = handle.receiver.recv() => match msg {
                Some(MaintenanceMessage::SweepCompleted { removed }) => {
                    info!(removed, "sweep pass finished");
                }
                None => {
                    warn!("maintenance task exited");
                    break;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("shutting down");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = cli.apply_overrides(CacheConfig::from_env()?);
    let cache = CacheManager::open(&config.db_path, config.retention)
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;

    match cli.command.clone() {
        Command::Stats => {
            let stats = cache.stats();
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("{}", stats);
            }
        }
        Command::Events { symbol, from, to } => {
            let events = cache.get_events(symbol.as_deref(), from, to);
            if cli.json {
                print_json(&events)?;
            } else {
                println!("{}", output::format_events(&events));
            }
        }
        Command::Snapshot { symbol } => {
            let snapshot = cache.get_snapshot(&symbol);
            if cli.json {
                print_json(&snapshot)?;
            } else {
                println!("{}", output::format_snapshot(&symbol, snapshot.as_ref()));
            }
        }
        Command::Detail { symbol, date } => match cache.event_detail(&symbol, date) {
            Some(detail) if cli.json => print_json(&detail)?,
            Some(detail) => println!("{}", output::format_detail(&detail)),
            None => anyhow::bail!("no earnings event for {} on {}", symbol, date),
        },
        Command::Sweep => {
            let removed = cache.sweep_expired();
            if cli.json {
                print_json(&serde_json::json!({ "removed": removed }))?;
            } else {
                println!("Removed {} expired records.", removed);
            }
        }
        Command::Export { output } => {
            let path = cache.export_json(output.as_deref())?;
            if cli.json {
                print_json(&serde_json::json!({ "path": path }))?;
            } else {
                println!("{}", path.display());
            }
        }
        Command::Import { path } => {
            let imported = cache.import_json(&path)?;
            if cli.json {
                print_json(&serde_json::json!({ "imported": imported }))?;
            } else {
                println!("Imported {} events from {}.", imported, path.display());
            }
        }
        Command::Seed { force } => {
            let mut rng = rand::thread_rng();
            let today = Local::now().date_naive();
            let options = SeedOptions {
                event_freshness_hours: config.event_freshness_hours,
                snapshot_freshness_hours: config.snapshot_freshness_hours,
                force,
            };
            let report = synthetic::seed(&cache, &mut rng, today, options);
            if cli.json {
                print_json(&report)?;
            } else {
                println!("{}", output::format_seed_report(&report));
            }
        }
        Command::Watch { interval_secs } => watch(cache, interval_secs).await?,
    }

    Ok(())
}
