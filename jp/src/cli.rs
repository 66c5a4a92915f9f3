//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::driver::Selection;
use crate::pool::PoolConfig;

/// jp - bounded job pool
#[derive(Parser, Debug)]
#[command(name = "jp")]
#[command(author, version, about = "Run external jobs through a bounded pool with per-job timeouts", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(flatten)]
    pub pool: PoolArgs,

    /// Event output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Also append every event as JSONL to this file
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the pool section of the config file
#[derive(Args, Debug, Default, Clone)]
pub struct PoolArgs {
    /// Max concurrently running jobs
    #[arg(short = 'j', long = "jobs")]
    pub capacity: Option<usize>,

    /// Milliseconds between liveness checks
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Kill jobs running this many milliseconds (0 = no timeout)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl PoolArgs {
    /// Apply CLI overrides on top of file configuration
    pub fn apply(&self, mut config: PoolConfig) -> PoolConfig {
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(poll) = self.poll_interval_ms {
            config.poll_interval_ms = poll;
        }
        if let Some(timeout) = self.timeout_ms {
            config.timeout_ms = Some(timeout);
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a script once per selected snapshot of every group
    Snapshots {
        /// Root of the <group>/<snapshot> tree
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Which snapshots of each group to run
        #[arg(short, long, value_enum)]
        select: Option<Selection>,

        /// Skip snapshots whose output directory here already holds the marker file
        #[arg(long)]
        logs_dir: Option<PathBuf>,

        /// Marker file name (default: memusage.log)
        #[arg(long)]
        marker: Option<String>,

        /// Script to run; receives "<group>/<snapshot>" as its first argument
        #[arg(required = true)]
        script: String,

        /// Extra arguments passed after the snapshot
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run the jobs listed in a YAML batch file
    Batch {
        /// Batch file path
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Print the effective configuration
    ShowConfig,
}

/// Output format for the event stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}
