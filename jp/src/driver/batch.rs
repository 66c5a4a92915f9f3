//! Batch job files
//!
//! ```yaml
//! - name: net1/2016-01-01
//!   command: [scripts/verify.sh, net1/2016-01-01]
//! - command: [sleep, "5"]    # identity defaults to the program
//! ```

use std::path::Path;

use eyre::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::Job;
use crate::launcher::JobSpec;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchEntry {
    #[serde(default)]
    name: Option<String>,
    command: JobSpec,
}

impl From<BatchEntry> for Job {
    fn from(entry: BatchEntry) -> Self {
        match entry.name {
            Some(name) => Job::new(name, entry.command),
            None => Job::unnamed(entry.command),
        }
    }
}

/// Parse a YAML list of jobs
pub fn parse_batch(content: &str) -> Result<Vec<Job>> {
    let entries: Vec<BatchEntry> = serde_yaml::from_str(content).context("Failed to parse batch file")?;
    Ok(entries.into_iter().map(Job::from).collect())
}

/// Load a YAML batch file
pub fn load_batch(path: &Path) -> Result<Vec<Job>> {
    debug!(?path, "load_batch: called");
    let content = std::fs::read_to_string(path).context(format!("Failed to read batch file {}", path.display()))?;
    let jobs = parse_batch(&content)?;
    debug!(count = jobs.len(), "load_batch: loaded");
    Ok(jobs)
}
