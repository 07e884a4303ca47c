//! Periodic background refresh.
//!
//! `RefreshDaemon` drives a [`RefreshCoordinator`] on a tokio timer: it sleeps
//! the normal interval after a completed or skipped run and the shorter retry
//! interval after a failed one. The refresh itself is synchronous and runs on
//! the blocking pool; tokio only drives scheduling and shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::refresh::{DEFAULT_INTERVAL, RefreshCoordinator, RefreshOutcome};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Cadence of the background refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    /// Sleep after a completed or skipped run (default: 2 h).
    pub interval: Duration,
    /// Sleep after a failed run (default: 5 min).
    pub retry_interval: Duration,
    /// Maximum refresh cycles (0 = unlimited).
    pub max_cycles: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            retry_interval: Duration::from_secs(300),
            max_cycles: 0,
        }
    }
}

/// Counts of what the daemon did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DaemonReport {
    pub cycles: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Long-running task that refreshes the engine on a schedule.
pub struct RefreshDaemon {
    coordinator: Arc<RefreshCoordinator>,
    config: DaemonConfig,
    report: DaemonReport,
}

impl RefreshDaemon {
    pub fn new(coordinator: Arc<RefreshCoordinator>, config: DaemonConfig) -> Self {
        Self {
            coordinator,
            config,
            report: DaemonReport::default(),
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Run until `shutdown` resolves or `max_cycles` refreshes have run.
    ///
    /// The first refresh happens one interval after start; the engine is
    /// expected to hold its initial tables already.
    pub async fn run_until<F>(mut self, shutdown: F) -> DaemonReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut wait = self.config.interval;
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            retry_secs = self.config.retry_interval.as_secs(),
            "refresh daemon started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    wait = self.cycle().await;
                    if self.config.max_cycles > 0 && self.report.cycles >= self.config.max_cycles {
                        tracing::info!(max_cycles = self.config.max_cycles, "daemon: max cycles reached, shutting down");
                        break;
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("daemon: received shutdown signal");
                    break;
                }
            }
        }

        tracing::info!(report = ?self.report, "refresh daemon stopped");
        self.report
    }

    /// Run until Ctrl+C.
    pub async fn run(self) -> DaemonReport {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "daemon: cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// One refresh on the blocking pool. Returns how long to sleep next.
    async fn cycle(&mut self) -> Duration {
        self.report.cycles += 1;
        let coordinator = Arc::clone(&self.coordinator);
        let outcome = tokio::task::spawn_blocking(move || coordinator.refresh_now()).await;

        match outcome {
            Ok(RefreshOutcome::Completed { generation }) => {
                self.report.completed += 1;
                tracing::info!(generation, "daemon: scheduled refresh complete");
                self.config.interval
            }
            Ok(RefreshOutcome::Skipped) => {
                self.report.skipped += 1;
                self.config.interval
            }
            Ok(RefreshOutcome::Failed(e)) => {
                self.report.failed += 1;
                tracing::warn!(
                    error = %e,
                    retry_secs = self.config.retry_interval.as_secs(),
                    "daemon: scheduled refresh failed, backing off"
                );
                self.config.retry_interval
            }
            Err(e) => {
                self.report.failed += 1;
                tracing::error!(error = %e, "daemon: refresh task panicked");
                self.config.retry_interval
            }
        }
    }
}
