//! Per-job execution state tracked by the pool

use std::time::Duration;

use crate::launcher::JobHandle;

/// One in-flight job: its identity, its launch handle, and runtime accumulated by polling
#[derive(Debug)]
pub struct JobRecord<H> {
    identity: String,
    handle: H,
    runtime: Duration,
}

impl<H: JobHandle> JobRecord<H> {
    pub fn new(identity: impl Into<String>, handle: H) -> Self {
        Self {
            identity: identity.into(),
            handle,
            runtime: Duration::ZERO,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Runtime observed so far, in whole poll intervals
    pub fn runtime(&self) -> Duration {
        self.runtime
    }

    /// Credit one poll interval to a job seen still running
    pub(crate) fn advance(&mut self, interval: Duration) {
        self.runtime += interval;
    }
}
