//! Backend pool: the context object handed to request dispatch and health
//! monitoring.
//!
//! # Responsibilities
//! - Collect backends during startup (`PoolBuilder`)
//! - Select a backend per request with any policy
//! - Start the background health monitor over the same backends

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{BalancerConfig, HealthCheckConfig};
use crate::health::{probe, HealthChecker, HealthMonitor, HttpProbe, Probe};
use crate::load_balancer::{
    backend::Backend, error::BalancerError, registry::Registry, selector::Selector, HealthFilter,
    Policy,
};

/// Startup-phase registration. Consumed by `build`, after which the backend
/// list is fixed.
#[derive(Debug, Default)]
pub struct PoolBuilder {
    registry: Registry,
    filter: HealthFilter,
    default_policy: Policy,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health_filter(mut self, filter: HealthFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn default_policy(mut self, policy: Policy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Register a backend. Weight must be at least 1.
    pub fn register_backend(
        &mut self,
        address: impl Into<String>,
        weight: u32,
    ) -> Result<Arc<Backend>, BalancerError> {
        self.registry.register(address, weight)
    }

    pub fn build(self) -> BackendPool {
        tracing::info!(
            backends = self.registry.len(),
            policy = %self.default_policy,
            health_filter = ?self.filter,
            "Backend pool ready"
        );
        BackendPool {
            selector: Arc::new(Selector::new(self.registry, self.filter)),
            default_policy: self.default_policy,
        }
    }
}

/// Shared handle to the closed backend set and its selection state.
///
/// Cheap to clone; clones share cursors and health.
#[derive(Debug, Clone)]
pub struct BackendPool {
    selector: Arc<Selector>,
    default_policy: Policy,
}

impl BackendPool {
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Build a pool from the `selection` and `backends` configuration sections.
    pub fn from_config(config: &BalancerConfig) -> Result<Self, BalancerError> {
        let mut builder = PoolBuilder::new()
            .health_filter(config.selection.health_filter)
            .default_policy(config.selection.policy);
        for backend in &config.backends {
            builder.register_backend(backend.address.clone(), backend.weight)?;
        }
        Ok(builder.build())
    }

    /// Pick a backend for one request.
    pub fn select_backend(
        &self,
        policy: Policy,
        key: Option<&str>,
    ) -> Result<Arc<Backend>, BalancerError> {
        self.selector.select(policy, key)
    }

    /// Pick a backend with the configured default policy.
    pub fn select(&self, key: Option<&str>) -> Result<Arc<Backend>, BalancerError> {
        self.selector.select(self.default_policy, key)
    }

    pub fn default_policy(&self) -> Policy {
        self.default_policy
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Return a list of all backends (for health checking).
    pub fn backends(&self) -> &[Arc<Backend>] {
        self.selector.backends()
    }

    pub fn len(&self) -> usize {
        self.backends().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends().is_empty()
    }

    /// A health checker over this pool's backends.
    pub fn health_checker(&self, probe: Arc<dyn Probe>) -> HealthChecker {
        HealthChecker::new(self.backends().to_vec(), probe)
    }

    /// Start HTTP health monitoring with single-result transitions.
    pub fn start_health_monitoring(
        &self,
        tick_interval: Duration,
        probe_timeout: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let checker = self.health_checker(Arc::new(HttpProbe::default()));
        HealthMonitor::new(checker, tick_interval, probe_timeout).spawn(shutdown)
    }

    /// Start health monitoring as described by the configuration.
    pub fn start_health_monitoring_with(
        &self,
        config: &HealthCheckConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let checker = self
            .health_checker(probe::from_config(config))
            .with_thresholds(config.healthy_threshold, config.unhealthy_threshold);
        HealthMonitor::new(
            checker,
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.timeout_secs),
        )
        .spawn(shutdown)
    }
}
