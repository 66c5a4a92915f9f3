//! Job launching - spawn, poll and kill primitives
//!
//! The pool talks to running jobs only through [`Launcher`] and [`JobHandle`].
//! [`ProcessLauncher`] backs them with OS processes via `tokio::process`.

use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::pool::PoolError;

/// An external command: executable followed by positional arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct JobSpec {
    argv: Vec<String>,
}

impl JobSpec {
    /// Build from a full argument vector: program first, then arguments
    pub fn new<I, S>(argv: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        match argv.first() {
            Some(program) if !program.is_empty() => Ok(Self { argv }),
            _ => Err(PoolError::EmptyCommand),
        }
    }

    /// The executable
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Positional arguments after the executable
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl TryFrom<Vec<String>> for JobSpec {
    type Error = PoolError;

    fn try_from(argv: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(argv)
    }
}

impl From<JobSpec> for Vec<String> {
    fn from(spec: JobSpec) -> Self {
        spec.argv
    }
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// How a job ended on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobExit {
    /// Normal exit with a status code
    Code(i32),
    /// Terminated by a signal the pool did not send
    Signal(i32),
}

impl JobExit {
    pub fn success(&self) -> bool {
        matches!(self, JobExit::Code(0))
    }
}

impl From<ExitStatus> for JobExit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return JobExit::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return JobExit::Signal(signal);
            }
        }

        JobExit::Code(-1)
    }
}

impl fmt::Display for JobExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobExit::Code(code) => write!(f, "{}", code),
            JobExit::Signal(signal) => match nix::sys::signal::Signal::try_from(*signal) {
                Ok(sig) => write!(f, "signal {}", sig.as_str()),
                Err(_) => write!(f, "signal {}", signal),
            },
        }
    }
}

/// A launched job, exclusively owned by its pool record
#[async_trait]
pub trait JobHandle: Send {
    /// OS process id, if the job has one
    fn id(&self) -> Option<u32>;

    /// Non-blocking check for exit; `Ok(None)` while still running
    fn try_exit(&mut self) -> io::Result<Option<JobExit>>;

    /// Unconditionally terminate the job and reap it
    async fn kill(&mut self) -> io::Result<()>;
}

/// Starts jobs described by a [`JobSpec`]
pub trait Launcher: Send + Sync {
    type Handle: JobHandle;

    fn launch(&self, spec: &JobSpec) -> io::Result<Self::Handle>;
}

/// Launches jobs as OS processes with all standard streams on the null device
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    type Handle = ProcessHandle;

    fn launch(&self, spec: &JobSpec) -> io::Result<ProcessHandle> {
        debug!(program = spec.program(), args = ?spec.args(), "ProcessLauncher::launch: spawning");
        let child = Command::new(spec.program())
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        debug!(pid = ?child.id(), "ProcessLauncher::launch: spawned");
        Ok(ProcessHandle { child })
    }
}

/// Handle to a job spawned by [`ProcessLauncher`]
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
}

#[async_trait]
impl JobHandle for ProcessHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit(&mut self) -> io::Result<Option<JobExit>> {
        Ok(self.child.try_wait()?.map(JobExit::from))
    }

    async fn kill(&mut self) -> io::Result<()> {
        debug!(pid = ?self.child.id(), "ProcessHandle::kill: sending SIGKILL");
        self.child.kill().await
    }
}
