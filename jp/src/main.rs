//! jp - bounded job pool
//!
//! CLI entry point: enumerate jobs, run them through a pool, print events.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use jobpool::cli::{Cli, Command, OutputFormat};
use jobpool::config::Config;
use jobpool::driver::{self, Job};
use jobpool::events::spawn_event_printer;
use jobpool::pool::{Pool, PoolConfig, PoolStats};

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobpool")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = cli_log_level.or(config_log_level).map(parse_level).unwrap_or(tracing::Level::INFO);

    let log_file = fs::File::create(log_dir.join("jobpool.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let pool_config = cli.pool.apply(config.pool.clone());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Snapshots {
            dir,
            select,
            logs_dir,
            marker,
            script,
            args,
        } => {
            let mut snapshots = config.snapshots.clone();
            snapshots.dir = dir.or(snapshots.dir);
            snapshots.select = select.unwrap_or(snapshots.select);
            snapshots.logs_dir = logs_dir.or(snapshots.logs_dir);
            if let Some(marker) = marker {
                snapshots.marker = marker;
            }

            let root = snapshots
                .dir
                .clone()
                .ok_or_else(|| eyre::eyre!("No snapshots directory: pass --dir or set snapshots.dir in config"))?;
            let marker = snapshots.completion_marker();
            let found = driver::discover_snapshots(&root, snapshots.select, marker.as_ref())
                .context(format!("Failed to enumerate snapshots under {}", root.display()))?;
            info!(count = found.len(), root = %root.display(), "Discovered snapshots");

            let jobs = driver::snapshot_jobs(&found, &script, &args)?;
            run_pool(pool_config, jobs, cli.format, cli.events_file.as_deref()).await
        }
        Command::Batch { file } => {
            let jobs = driver::load_batch(&file)?;
            run_pool(pool_config, jobs, cli.format, cli.events_file.as_deref()).await
        }
        Command::ShowConfig => {
            let effective = Config {
                pool: pool_config,
                ..config
            };
            print!("{}", serde_yaml::to_string(&effective)?);
            Ok(())
        }
    }
}

/// Run jobs through a fresh pool while a background task prints events
async fn run_pool(pool_config: PoolConfig, jobs: Vec<Job>, format: OutputFormat, events_file: Option<&Path>) -> Result<()> {
    info!(jobs = jobs.len(), ?pool_config, "run_pool: starting");
    if jobs.is_empty() {
        warn!("run_pool: no jobs to run");
    }

    let mut pool = Pool::new(pool_config).context("Failed to create pool")?;
    let printer = spawn_event_printer(pool.subscribe(), format, events_file)?;

    let result = driver::run_jobs(&mut pool, jobs).await;
    let stats = pool.stats().clone();

    // Dropping the pool closes the bus, which ends the printer
    drop(pool);
    printer.await.context("Event printer task failed")?;

    if format == OutputFormat::Text {
        print_summary(&stats);
    }
    result.context("Job run aborted")
}

fn print_summary(stats: &PoolStats) {
    let status = if stats.failed == 0 && stats.killed == 0 {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "{} {} jobs: {} succeeded, {} failed, {} killed (peak {} active)",
        status,
        stats.submitted,
        stats.succeeded.to_string().green(),
        stats.failed.to_string().yellow(),
        stats.killed.to_string().red(),
        stats.peak_active
    );
}
