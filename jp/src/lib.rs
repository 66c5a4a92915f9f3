//! JobPool - bounded pool of external jobs
//!
//! Launches a large, known-up-front set of external commands while capping how
//! many run at once, and kills any job that runs longer than a configured
//! budget.
//!
//! # Core Concepts
//!
//! - **Admission**: `submit` waits for a free slot, launches, and returns at once
//! - **Polling**: one control flow checks every job each poll interval
//! - **Timeouts**: runtime accrues per poll; at the limit the job gets SIGKILL
//! - **Events**: start, finish, kill and status lines for the operator
//!
//! # Example
//!
//! ```ignore
//! use jobpool::{JobSpec, Pool, PoolConfig};
//!
//! let mut pool = Pool::new(PoolConfig { capacity: 4, poll_interval_ms: 1000, timeout_ms: Some(600_000) })?;
//! for snapshot in ["net1/2016-01-01", "net2/2016-01-01"] {
//!     pool.submit(JobSpec::new(["scripts/verify.sh", snapshot])?, snapshot).await?;
//! }
//! pool.join().await?;
//! ```
//!
//! # Modules
//!
//! - [`pool`] - admission, monitoring and timeout enforcement
//! - [`launcher`] - spawn/poll/kill primitives
//! - [`events`] - event vocabulary, bus and printer
//! - [`driver`] - job enumeration (snapshot trees, batch files)
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod driver;
pub mod events;
pub mod launcher;
pub mod pool;

// Re-export commonly used types
pub use config::{Config, SnapshotsConfig};
pub use driver::{Job, run_jobs};
pub use events::{EventBus, EventLogEntry, EventPrinter, PoolEvent, spawn_event_printer};
pub use launcher::{JobExit, JobHandle, JobSpec, Launcher, ProcessHandle, ProcessLauncher};
pub use pool::{JobRecord, Pool, PoolConfig, PoolError, PoolStats};
