//! One round of health checks.
//!
//! # Responsibilities
//! - Probe every backend, each bounded by the same timeout
//! - Turn probe outcomes into UP/DOWN transitions
//! - Keep one backend's failure from affecting any other

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time;

use crate::health::probe::{Probe, ProbeError};
use crate::load_balancer::Backend;
use crate::observability::metrics;

pub struct HealthChecker {
    backends: Vec<Arc<Backend>>,
    probe: Arc<dyn Probe>,
    healthy_threshold: usize,
    unhealthy_threshold: usize,
}

impl HealthChecker {
    /// Checker with single-result transitions: one failure marks DOWN, one
    /// success marks UP.
    pub fn new(backends: Vec<Arc<Backend>>, probe: Arc<dyn Probe>) -> Self {
        Self {
            backends,
            probe,
            healthy_threshold: 1,
            unhealthy_threshold: 1,
        }
    }

    /// Require consecutive results before a transition.
    pub fn with_thresholds(mut self, healthy: u32, unhealthy: u32) -> Self {
        self.healthy_threshold = healthy.max(1) as usize;
        self.unhealthy_threshold = unhealthy.max(1) as usize;
        self
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Probe all backends concurrently and update their health.
    pub async fn check(&self, timeout: Duration) {
        let rounds = self.backends.iter().map(|backend| async move {
            let outcome = match time::timeout(timeout, self.probe.probe(backend)).await {
                Ok(result) => result,
                Err(_) => Err(ProbeError::Timeout(timeout)),
            };
            self.apply(backend, outcome);
        });
        join_all(rounds).await;

        let up = self.backends.iter().filter(|b| b.is_up()).count();
        tracing::debug!(
            up,
            down = self.backends.len() - up,
            "Health check round complete"
        );
        for backend in &self.backends {
            tracing::trace!(addr = %backend.address(), state = %backend.health(), "Backend status");
        }
    }

    fn apply(&self, backend: &Backend, outcome: Result<(), ProbeError>) {
        let addr = backend.address();
        match outcome {
            Ok(()) => {
                metrics::record_health_check(true);
                if backend.mark_success(self.healthy_threshold) {
                    tracing::info!(addr = %addr, "Backend is UP");
                }
            }
            Err(e) => {
                metrics::record_health_check(false);
                tracing::warn!(addr = %addr, error = %e, "Health check failed");
                if backend.mark_failure(self.unhealthy_threshold) {
                    tracing::warn!(addr = %addr, "Backend marked DOWN");
                }
            }
        }

        metrics::record_backend_health(addr, backend.is_up());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::HealthState;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Scripted probe: behaviour per address.
    #[derive(Debug)]
    enum Script {
        Pass,
        Fail,
        Hang,
    }

    #[derive(Debug)]
    struct ScriptedProbe(HashMap<String, Script>);

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, backend: &Backend) -> Result<(), ProbeError> {
            match self.0.get(backend.address()) {
                Some(Script::Pass) => Ok(()),
                Some(Script::Hang) => {
                    time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
                _ => Err(ProbeError::Connect("refused".into())),
            }
        }
    }

    fn backends(n: usize) -> Vec<Arc<Backend>> {
        (0..n).map(|i| Arc::new(Backend::new(format!("b{i}"), 1))).collect()
    }

    fn probe(script: Vec<(&str, Script)>) -> Arc<dyn Probe> {
        Arc::new(ScriptedProbe(
            script.into_iter().map(|(a, s)| (a.to_string(), s)).collect(),
        ))
    }

    #[tokio::test]
    async fn test_timeout_marks_down() {
        let backends = backends(1);
        let checker = HealthChecker::new(backends.clone(), probe(vec![("b0", Script::Hang)]));

        let started = time::Instant::now();
        checker.check(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(backends[0].health(), HealthState::Down);
    }

    #[tokio::test]
    async fn test_success_keeps_or_restores_up() {
        let backends = backends(2);
        backends[1].set_health(HealthState::Down);
        let checker = HealthChecker::new(
            backends.clone(),
            probe(vec![("b0", Script::Pass), ("b1", Script::Pass)]),
        );

        checker.check(Duration::from_millis(100)).await;
        assert!(backends.iter().all(|b| b.is_up()));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let backends = backends(3);
        backends[2].set_health(HealthState::Down);
        let checker = HealthChecker::new(
            backends.clone(),
            probe(vec![("b0", Script::Hang), ("b1", Script::Fail), ("b2", Script::Pass)]),
        );

        checker.check(Duration::from_millis(50)).await;
        assert_eq!(backends[0].health(), HealthState::Down);
        assert_eq!(backends[1].health(), HealthState::Down);
        assert_eq!(backends[2].health(), HealthState::Up);
    }

    #[tokio::test]
    async fn test_thresholds() {
        let backends = backends(1);
        let checker = HealthChecker::new(backends.clone(), probe(vec![("b0", Script::Fail)]))
            .with_thresholds(2, 3);

        checker.check(Duration::from_millis(50)).await;
        checker.check(Duration::from_millis(50)).await;
        assert!(backends[0].is_up());
        checker.check(Duration::from_millis(50)).await;
        assert!(!backends[0].is_up());
    }
}
