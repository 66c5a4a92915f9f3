//! Snapshot tree enumeration
//!
//! Layout: `<root>/<group>/<snapshot>`, where snapshot names sort by time.
//! Each selected snapshot becomes `[script, "<group>/<snapshot>", args...]`.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use super::Job;
use crate::launcher::JobSpec;
use crate::pool::PoolError;

/// Which snapshots of each group to process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Earliest snapshot only
    #[default]
    First,
    /// Latest snapshot only
    Last,
    /// Every snapshot
    All,
}

/// One snapshot of one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub group: String,
    pub name: String,
}

impl Snapshot {
    /// `<group>/<snapshot>`, used as job identity and script argument
    pub fn id(&self) -> String {
        format!("{}/{}", self.group, self.name)
    }
}

/// Marks a snapshot as already processed when `<logs_dir>/<group>/<snapshot>/<marker>` exists
#[derive(Debug, Clone)]
pub struct CompletionMarker {
    pub logs_dir: PathBuf,
    pub marker: String,
}

impl CompletionMarker {
    pub fn is_complete(&self, snapshot: &Snapshot) -> bool {
        self.logs_dir
            .join(&snapshot.group)
            .join(&snapshot.name)
            .join(&self.marker)
            .exists()
    }
}

/// Immediate children of `dir`, sorted by name, hidden entries skipped
fn sorted_children(dir: &Path, dirs_only: bool) -> Result<Vec<(String, PathBuf)>> {
    let mut children = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.context(format!("Failed to read {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if dirs_only && !entry.file_type().is_dir() {
            debug!(%name, "sorted_children: skipping non-directory");
            continue;
        }
        children.push((name, entry.into_path()));
    }
    Ok(children)
}

/// Walk the tree and pick snapshots per group.
///
/// Selection is applied first; snapshots with a completion marker are then dropped.
pub fn discover_snapshots(root: &Path, selection: Selection, marker: Option<&CompletionMarker>) -> Result<Vec<Snapshot>> {
    debug!(?root, ?selection, "discover_snapshots: called");
    let mut selected = Vec::new();

    for (group, group_path) in sorted_children(root, true)? {
        let names: Vec<String> = sorted_children(&group_path, false)?
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        let chosen: Vec<String> = match selection {
            Selection::First => names.into_iter().take(1).collect(),
            Selection::Last => names.into_iter().last().into_iter().collect(),
            Selection::All => names,
        };

        for name in chosen {
            let snapshot = Snapshot {
                group: group.clone(),
                name,
            };
            if marker.is_some_and(|m| m.is_complete(&snapshot)) {
                debug!(snapshot = %snapshot.id(), "discover_snapshots: already complete, skipping");
                continue;
            }
            selected.push(snapshot);
        }
    }

    debug!(count = selected.len(), "discover_snapshots: done");
    Ok(selected)
}

/// Build `[script, "<group>/<snapshot>", extra_args...]` jobs
pub fn snapshot_jobs(snapshots: &[Snapshot], script: &str, extra_args: &[String]) -> Result<Vec<Job>, PoolError> {
    snapshots
        .iter()
        .map(|snapshot| {
            let id = snapshot.id();
            let argv = std::iter::once(script.to_string())
                .chain(std::iter::once(id.clone()))
                .chain(extra_args.iter().cloned());
            Ok(Job::new(id, JobSpec::new(argv)?))
        })
        .collect()
}
