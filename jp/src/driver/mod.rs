//! Driver - enumerates jobs and feeds them to a pool
//!
//! The pool only knows how to run commands; the driver decides which commands
//! exist. Two sources are supported:
//!
//! - [`snapshots`]: one job per selected snapshot in a `<group>/<snapshot>` tree
//! - [`batch`]: an explicit YAML list of commands

pub mod batch;
pub mod snapshots;

use eyre::Result;
use tracing::{debug, error, info, warn};

use crate::launcher::{JobSpec, Launcher};
use crate::pool::{Pool, PoolError};

pub use batch::{load_batch, parse_batch};
pub use snapshots::{CompletionMarker, Selection, Snapshot, discover_snapshots, snapshot_jobs};

/// A job ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub identity: String,
    pub spec: JobSpec,
}

impl Job {
    pub fn new(identity: impl Into<String>, spec: JobSpec) -> Self {
        Self {
            identity: identity.into(),
            spec,
        }
    }

    /// Job named after its program
    pub fn unnamed(spec: JobSpec) -> Self {
        Self {
            identity: spec.program().to_string(),
            spec,
        }
    }
}

/// Submit every job in order, then drain the pool.
///
/// A launch failure stops enumeration: jobs already running are drained
/// before the launch error is returned.
pub async fn run_jobs<L, I>(pool: &mut Pool<L>, jobs: I) -> Result<()>
where
    L: Launcher,
    I: IntoIterator<Item = Job>,
{
    debug!("run_jobs: called");
    for job in jobs {
        match pool.submit(job.spec, job.identity).await {
            Ok(()) => {}
            Err(err @ PoolError::Launch { .. }) => {
                warn!(error = %err, active = pool.active_count(), "run_jobs: launch failed, draining running jobs");
                if let Err(drain_err) = pool.join().await {
                    error!(error = %drain_err, "run_jobs: drain after launch failure failed");
                }
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        }
    }

    pool.join().await?;
    info!(stats = ?pool.stats(), "run_jobs: all jobs ended");
    Ok(())
}
