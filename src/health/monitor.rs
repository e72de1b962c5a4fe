//! Active health checking on a timer.
//!
//! # Responsibilities
//! - Run a health check round every interval
//! - Stop when the shutdown signal fires

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::health::checker::HealthChecker;

pub struct HealthMonitor {
    checker: HealthChecker,
    interval: Duration,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(checker: HealthChecker, interval: Duration, timeout: Duration) -> Self {
        if timeout >= interval {
            tracing::warn!(
                interval_ms = interval.as_millis() as u64,
                timeout_ms = timeout.as_millis() as u64,
                "Probe timeout is not below the check interval, rounds may overlap"
            );
        }

        Self {
            checker,
            // tokio intervals panic on a zero period
            interval: interval.max(Duration::from_millis(1)),
            timeout,
        }
    }

    /// Run until `shutdown` fires or its sender is dropped.
    ///
    /// A round already in progress is finished before exiting; each of its
    /// probes is bounded by the probe timeout.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            timeout_ms = self.timeout.as_millis() as u64,
            backends = self.checker.backends().len(),
            "Health monitor starting"
        );

        // First round after one full interval
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.checker.check(self.timeout).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run on a background task.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
