//! Counters kept by a pool across its lifetime

use serde::Serialize;

use crate::launcher::JobExit;

/// Statistics for the pool
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub submitted: u64,
    pub finished: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub killed: u64,
    pub peak_active: usize,
}

impl PoolStats {
    pub(crate) fn record_exit(&mut self, exit: JobExit) {
        self.finished += 1;
        if exit.success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Jobs that have left the pool, by exit or by kill
    pub fn ended(&self) -> u64 {
        self.finished + self.killed
    }
}
