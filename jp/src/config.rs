//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::driver::{CompletionMarker, Selection};
use crate::pool::PoolConfig;

/// Default completion marker file name
pub const DEFAULT_MARKER: &str = "memusage.log";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Pool limits
    pub pool: PoolConfig,

    /// Snapshot tree driver settings
    pub snapshots: SnapshotsConfig,
}

/// Snapshot tree driver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotsConfig {
    /// Root of the `<group>/<snapshot>` tree
    pub dir: Option<PathBuf>,

    /// Which snapshots of each group to run
    pub select: Selection,

    /// Directory holding per-snapshot output; enables skipping completed snapshots
    #[serde(rename = "logs-dir")]
    pub logs_dir: Option<PathBuf>,

    /// File whose presence under the logs directory marks a snapshot complete
    pub marker: String,
}

impl Default for SnapshotsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            select: Selection::First,
            logs_dir: None,
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

impl SnapshotsConfig {
    /// Completion marker, when a logs directory is configured
    pub fn completion_marker(&self) -> Option<CompletionMarker> {
        self.logs_dir.as_ref().map(|logs_dir| CompletionMarker {
            logs_dir: logs_dir.clone(),
            marker: self.marker.clone(),
        })
    }
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./.jobpool.yml`, then `<config_dir>/jobpool/jobpool.yml`, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed here; `load` reports them once logging exists.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::default_paths().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        serde_yaml::from_str::<Self>(&content).ok()?.log_level
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".jobpool.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("jobpool").join("jobpool.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
