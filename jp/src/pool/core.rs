//! Pool implementation

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::events::{EventBus, PoolEvent};
use crate::launcher::{JobHandle, JobSpec, Launcher, ProcessLauncher};

use super::config::PoolConfig;
use super::error::PoolError;
use super::record::JobRecord;
use super::stats::PoolStats;

/// A bounded pool of external jobs.
///
/// All state lives in the instance and is only touched from `&mut self`
/// methods, so one control flow drives admission and monitoring while the
/// jobs themselves run in parallel as separate processes.
pub struct Pool<L: Launcher = ProcessLauncher> {
    config: PoolConfig,
    launcher: L,
    /// In-flight jobs, in admission order
    active: Vec<JobRecord<L::Handle>>,
    events: EventBus,
    stats: PoolStats,
}

impl Pool<ProcessLauncher> {
    /// Create a pool that runs jobs as OS processes
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_launcher(config, ProcessLauncher)
    }
}

impl<L: Launcher> Pool<L> {
    /// Create a pool with a custom launcher
    pub fn with_launcher(config: PoolConfig, launcher: L) -> Result<Self, PoolError> {
        debug!(?config, "Pool::with_launcher: called");
        config.validate()?;
        Ok(Self {
            config,
            launcher,
            active: Vec::new(),
            events: EventBus::with_default_capacity(),
            stats: PoolStats::default(),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of jobs currently in flight
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Identities of in-flight jobs, in admission order
    pub fn active_identities(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(JobRecord::identity)
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Subscribe to this pool's events
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.events.subscribe()
    }

    /// Launch a job once a slot is free.
    ///
    /// Waits (by monitoring) until fewer than `capacity` jobs are active, then
    /// launches and returns without waiting for the job. A launch failure is
    /// returned as-is and leaves the pool untouched.
    pub async fn submit(&mut self, spec: JobSpec, identity: impl Into<String>) -> Result<(), PoolError> {
        let identity = identity.into();
        debug!(%identity, %spec, "Pool::submit: called");

        self.wait_for(self.config.capacity - 1).await?;

        let handle = self.launcher.launch(&spec).map_err(|source| {
            warn!(%identity, program = spec.program(), error = %source, "Job failed to launch");
            PoolError::Launch {
                identity: identity.clone(),
                program: spec.program().to_string(),
                source,
            }
        })?;

        let pid = handle.id();
        self.active.push(JobRecord::new(identity.clone(), handle));
        self.stats.submitted += 1;
        self.stats.peak_active = self.stats.peak_active.max(self.active.len());

        info!(%identity, ?pid, active = self.active.len(), "Job started");
        self.events.emit(PoolEvent::Started { identity, pid });
        Ok(())
    }

    /// Block until at most `remaining` jobs are active.
    ///
    /// Each iteration sleeps one poll interval and then runs a monitoring pass.
    /// Returns immediately if the target is already met.
    pub async fn wait_for(&mut self, remaining: usize) -> Result<(), PoolError> {
        debug!(remaining, active = self.active.len(), "Pool::wait_for: called");
        while self.active.len() > remaining {
            tokio::time::sleep(self.config.poll_interval()).await;
            self.monitor_pass().await?;
        }
        Ok(())
    }

    /// Block until every job has exited or been killed
    pub async fn join(&mut self) -> Result<(), PoolError> {
        debug!(active = self.active.len(), "Pool::join: called");
        self.wait_for(0).await
    }

    /// Check every active job once: reap exits, credit runtime, kill on timeout.
    ///
    /// Jobs found ended are removed even when the pass stops early on a query
    /// or kill failure; the failing job itself stays tracked.
    async fn monitor_pass(&mut self) -> Result<(), PoolError> {
        let interval = self.config.poll_interval();
        let timeout = self.config.timeout();
        let mut ended = Vec::new();
        let mut failure = None;

        for (idx, record) in self.active.iter_mut().enumerate() {
            match record.handle_mut().try_exit() {
                Ok(Some(exit)) => {
                    info!(identity = record.identity(), %exit, runtime = ?record.runtime(), "Job finished");
                    self.stats.record_exit(exit);
                    self.events.emit(PoolEvent::Finished {
                        identity: record.identity().to_string(),
                        exit,
                        runtime_ms: record.runtime().as_millis() as u64,
                    });
                    ended.push(idx);
                }
                Ok(None) => {
                    record.advance(interval);
                    let Some(limit) = timeout else {
                        continue;
                    };
                    if record.runtime() < limit {
                        continue;
                    }

                    if let Err(source) = record.handle_mut().kill().await {
                        error!(identity = record.identity(), error = %source, "Failed to kill timed out job");
                        failure = Some(PoolError::Kill {
                            identity: record.identity().to_string(),
                            source,
                        });
                        break;
                    }

                    warn!(identity = record.identity(), runtime = ?record.runtime(), "Job timed out, killed");
                    self.stats.killed += 1;
                    self.events.emit(PoolEvent::Killed {
                        identity: record.identity().to_string(),
                        runtime_ms: record.runtime().as_millis() as u64,
                    });
                    ended.push(idx);
                }
                Err(source) => {
                    error!(identity = record.identity(), error = %source, "Failed to query job status");
                    failure = Some(PoolError::Monitor {
                        identity: record.identity().to_string(),
                        source,
                    });
                    break;
                }
            }
        }

        for idx in ended.into_iter().rev() {
            self.active.remove(idx);
        }

        debug!(active = self.active.len(), capacity = self.config.capacity, "Pool::monitor_pass: done");
        self.events.emit(PoolEvent::Status {
            active: self.active.len(),
            capacity: self.config.capacity,
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<L: Launcher> Drop for Pool<L> {
    fn drop(&mut self) {
        if !self.active.is_empty() {
            warn!(active = self.active.len(), "Pool dropped with jobs still running");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::JobExit;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Shared counters observed by the tests
    #[derive(Clone, Default)]
    struct Probe {
        live: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        kills: Arc<AtomicUsize>,
    }

    enum Script {
        ExitAfter { polls: u32, code: i32 },
        Never,
        QueryFails,
        Unkillable,
    }

    struct ScriptedHandle {
        script: Script,
        probe: Probe,
    }

    #[async_trait]
    impl JobHandle for ScriptedHandle {
        fn id(&self) -> Option<u32> {
            None
        }

        fn try_exit(&mut self) -> io::Result<Option<JobExit>> {
            match &mut self.script {
                Script::ExitAfter { polls: 0, code } => {
                    self.probe.live.fetch_sub(1, Ordering::SeqCst);
                    Ok(Some(JobExit::Code(*code)))
                }
                Script::ExitAfter { polls, .. } => {
                    *polls -= 1;
                    Ok(None)
                }
                Script::Never | Script::Unkillable => Ok(None),
                Script::QueryFails => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            }
        }

        async fn kill(&mut self) -> io::Result<()> {
            if matches!(self.script, Script::Unkillable) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            self.probe.live.fetch_sub(1, Ordering::SeqCst);
            self.probe.kills.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Interprets the job command as a script: `exit <polls> <code>`, `never`,
    /// `broken`, `unkillable`, or `missing` (launch failure)
    struct ScriptedLauncher {
        probe: Probe,
    }

    impl Launcher for ScriptedLauncher {
        type Handle = ScriptedHandle;

        fn launch(&self, spec: &JobSpec) -> io::Result<ScriptedHandle> {
            let script = match spec.program() {
                "exit" => Script::ExitAfter {
                    polls: spec.args()[0].parse().unwrap(),
                    code: spec.args()[1].parse().unwrap(),
                },
                "never" => Script::Never,
                "broken" => Script::QueryFails,
                "unkillable" => Script::Unkillable,
                _ => return Err(io::Error::from(io::ErrorKind::NotFound)),
            };
            let live = self.probe.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.peak.fetch_max(live, Ordering::SeqCst);
            Ok(ScriptedHandle {
                script,
                probe: self.probe.clone(),
            })
        }
    }

    fn pool(capacity: usize, timeout_ms: Option<u64>) -> (Pool<ScriptedLauncher>, Probe) {
        let probe = Probe::default();
        let config = PoolConfig {
            capacity,
            poll_interval_ms: 1,
            timeout_ms,
        };
        let pool = Pool::with_launcher(config, ScriptedLauncher { probe: probe.clone() }).unwrap();
        (pool, probe)
    }

    fn job(script: &str) -> JobSpec {
        JobSpec::new(script.split_whitespace()).unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<PoolEvent>) -> Vec<PoolEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn position(events: &[PoolEvent], event_type: &str, identity: &str) -> usize {
        events
            .iter()
            .position(|e| e.event_type() == event_type && e.identity() == Some(identity))
            .unwrap()
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        let result = Pool::with_launcher(
            PoolConfig::with_capacity(0),
            ScriptedLauncher {
                probe: Probe::default(),
            },
        );
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_join_on_empty_pool_returns_immediately() {
        let config = PoolConfig {
            capacity: 1,
            poll_interval_ms: 60_000,
            timeout_ms: None,
        };
        let mut pool = Pool::with_launcher(
            config,
            ScriptedLauncher {
                probe: Probe::default(),
            },
        )
        .unwrap();
        let mut rx = pool.subscribe();

        tokio::time::timeout(Duration::from_secs(1), pool.join())
            .await
            .expect("join on an empty pool should not sleep")
            .unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_submit_returns_without_waiting_for_job() {
        let (mut pool, _probe) = pool(2, None);
        let mut rx = pool.subscribe();

        pool.submit(job("never"), "a").await.unwrap();
        pool.submit(job("never"), "b").await.unwrap();

        assert_eq!(pool.active_count(), 2);
        assert_eq!(pool.active_identities().collect::<Vec<_>>(), vec!["a", "b"]);
        let types: Vec<_> = drain(&mut rx).iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["Started", "Started"]);
    }

    #[tokio::test]
    async fn test_capacity_never_exceeded() {
        let (mut pool, probe) = pool(3, None);

        for i in 0..10 {
            let script = format!("exit {} 0", i % 4);
            pool.submit(job(&script), format!("job-{}", i)).await.unwrap();
            assert!(pool.active_count() <= 3);
        }
        pool.join().await.unwrap();

        assert_eq!(pool.active_count(), 0);
        assert!(probe.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(probe.live.load(Ordering::SeqCst), 0);
        assert_eq!(pool.stats().peak_active, 3);
        assert_eq!(pool.stats().submitted, 10);
        assert_eq!(pool.stats().finished, 10);
    }

    #[tokio::test]
    async fn test_fifo_admission_with_capacity_one() {
        let (mut pool, _probe) = pool(1, None);
        let mut rx = pool.subscribe();

        for name in ["A", "B", "C"] {
            pool.submit(job("exit 0 0"), name).await.unwrap();
        }
        pool.join().await.unwrap();

        let events = drain(&mut rx);
        let (a, b, c) = (
            position(&events, "Started", "A"),
            position(&events, "Started", "B"),
            position(&events, "Started", "C"),
        );
        assert!(a < b && b < c);
        assert!(position(&events, "Finished", "A") < b);
        assert!(position(&events, "Finished", "B") < c);
        assert_eq!(events.last(), Some(&PoolEvent::Status { active: 0, capacity: 1 }));
    }

    #[tokio::test]
    async fn test_every_job_removed_exactly_once() {
        let (mut pool, _probe) = pool(2, Some(3));
        let mut rx = pool.subscribe();

        pool.submit(job("exit 1 0"), "fast").await.unwrap();
        pool.submit(job("never"), "stuck").await.unwrap();
        pool.submit(job("exit 0 2"), "failing").await.unwrap();
        pool.join().await.unwrap();

        let events = drain(&mut rx);
        for identity in ["fast", "stuck", "failing"] {
            let endings = events
                .iter()
                .filter(|e| e.identity() == Some(identity))
                .filter(|e| matches!(e, PoolEvent::Finished { .. } | PoolEvent::Killed { .. }))
                .count();
            assert_eq!(endings, 1, "{} should end exactly once", identity);
        }

        let stats = pool.stats();
        assert_eq!(stats.ended(), 3);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.killed, 1);
    }

    #[tokio::test]
    async fn test_timeout_kills_on_first_tick_at_or_past_limit() {
        // 5ms timeout at 2ms polls: runtime 2, 4, 6 -> killed on the third pass
        let probe = Probe::default();
        let config = PoolConfig {
            capacity: 1,
            poll_interval_ms: 2,
            timeout_ms: Some(5),
        };
        let mut pool = Pool::with_launcher(config, ScriptedLauncher { probe: probe.clone() }).unwrap();
        let mut rx = pool.subscribe();

        pool.submit(job("never"), "J").await.unwrap();
        pool.join().await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                PoolEvent::Started {
                    identity: "J".to_string(),
                    pid: None
                },
                PoolEvent::Status { active: 1, capacity: 1 },
                PoolEvent::Status { active: 1, capacity: 1 },
                PoolEvent::Killed {
                    identity: "J".to_string(),
                    runtime_ms: 6
                },
                PoolEvent::Status { active: 0, capacity: 1 },
            ]
        );
        assert_eq!(probe.kills.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exit_seen_before_timeout_is_a_finish() {
        let (mut pool, probe) = pool(1, Some(3));
        let mut rx = pool.subscribe();

        // Seen running twice, exits on the third pass where the timeout would fire
        pool.submit(job("exit 2 0"), "J").await.unwrap();
        pool.join().await.unwrap();

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, PoolEvent::Finished { exit: JobExit::Code(0), .. })));
        assert!(!events.iter().any(|e| matches!(e, PoolEvent::Killed { .. })));
        assert_eq!(probe.kills.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_launch_failure_leaves_pool_untouched() {
        let (mut pool, _probe) = pool(5, None);
        let mut rx = pool.subscribe();

        let err = pool.submit(job("missing"), "ghost").await.unwrap_err();

        assert!(matches!(err, PoolError::Launch { ref identity, .. } if identity == "ghost"));
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.stats().submitted, 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_is_surfaced_and_job_kept() {
        let (mut pool, _probe) = pool(2, None);
        let mut rx = pool.subscribe();

        pool.submit(job("exit 0 0"), "ok").await.unwrap();
        pool.submit(job("broken"), "broken").await.unwrap();
        let err = pool.join().await.unwrap_err();

        assert!(matches!(err, PoolError::Monitor { ref identity, .. } if identity == "broken"));
        assert_eq!(pool.active_identities().collect::<Vec<_>>(), vec!["broken"]);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| e.event_type() == "Finished" && e.identity() == Some("ok")));
        assert_eq!(events.last(), Some(&PoolEvent::Status { active: 1, capacity: 2 }));
    }

    #[tokio::test]
    async fn test_kill_failure_is_surfaced_and_job_kept() {
        let (mut pool, _probe) = pool(1, Some(1));

        pool.submit(job("unkillable"), "stubborn").await.unwrap();
        let err = pool.join().await.unwrap_err();

        assert!(matches!(err, PoolError::Kill { ref identity, .. } if identity == "stubborn"));
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.stats().killed, 0);
    }

    #[tokio::test]
    async fn test_submit_after_join_starts_fresh() {
        let (mut pool, _probe) = pool(1, None);

        pool.submit(job("exit 0 0"), "first").await.unwrap();
        pool.join().await.unwrap();
        pool.submit(job("exit 0 0"), "second").await.unwrap();
        pool.join().await.unwrap();

        assert_eq!(pool.stats().submitted, 2);
        assert_eq!(pool.stats().finished, 2);
    }

    #[tokio::test]
    async fn test_pools_are_independent() {
        let (mut left, _) = pool(1, None);
        let (mut right, _) = pool(1, None);
        let mut left_rx = left.subscribe();
        let mut right_rx = right.subscribe();

        left.submit(job("exit 0 0"), "left").await.unwrap();
        right.submit(job("exit 0 0"), "right").await.unwrap();
        left.join().await.unwrap();
        right.join().await.unwrap();

        assert!(drain(&mut left_rx).iter().all(|e| e.identity() != Some("right")));
        assert!(drain(&mut right_rx).iter().all(|e| e.identity() != Some("left")));
    }
}
