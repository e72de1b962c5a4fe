//! Policy dispatch over a closed registry.
//!
//! # Responsibilities
//! - Own the closed registry and one state object per policy
//! - Validate the call (empty pool, missing key) before dispatching
//! - Record every selection in logs and metrics

use std::sync::Arc;

use crate::load_balancer::{
    backend::Backend,
    error::BalancerError,
    ip_hash::IpHash,
    random::Random,
    registry::{ClosedRegistry, Registry},
    round_robin::RoundRobin,
    smooth::SmoothWeightedRoundRobin,
    weighted_random::{WeightedRandom, WeightedRandomInterval},
    weighted_round_robin::{WeightedRoundRobin, WeightedRoundRobinInterval},
    Candidates, HealthFilter, LoadBalancer, Policy,
};
use crate::observability::metrics;

/// Stateful selector implementing every policy over one registry.
#[derive(Debug)]
pub struct Selector {
    registry: ClosedRegistry,
    filter: HealthFilter,
    random: Random,
    ip_hash: IpHash,
    weighted_random: WeightedRandom,
    weighted_random_interval: WeightedRandomInterval,
    round_robin: RoundRobin,
    weighted_round_robin: WeightedRoundRobin,
    weighted_round_robin_interval: WeightedRoundRobinInterval,
    smooth: SmoothWeightedRoundRobin,
}

impl Selector {
    /// Close the registry and build a selector over it.
    pub fn new(registry: Registry, filter: HealthFilter) -> Self {
        Self {
            registry: registry.close(),
            filter,
            random: Random::new(),
            ip_hash: IpHash::new(),
            weighted_random: WeightedRandom::new(),
            weighted_random_interval: WeightedRandomInterval::new(),
            round_robin: RoundRobin::new(),
            weighted_round_robin: WeightedRoundRobin::new(),
            weighted_round_robin_interval: WeightedRoundRobinInterval::new(),
            smooth: SmoothWeightedRoundRobin::new(),
        }
    }

    pub fn registry(&self) -> &ClosedRegistry {
        &self.registry
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        self.registry.all()
    }

    pub fn health_filter(&self) -> HealthFilter {
        self.filter
    }

    /// Current weights of the smooth policy, in registration order.
    pub fn smooth_weights(&self) -> Vec<i64> {
        self.smooth.current_weights()
    }

    fn strategy(&self, policy: Policy) -> &dyn LoadBalancer {
        match policy {
            Policy::Random => &self.random,
            Policy::IpHash => &self.ip_hash,
            Policy::WeightedRandom => &self.weighted_random,
            Policy::WeightedRandomInterval => &self.weighted_random_interval,
            Policy::RoundRobin => &self.round_robin,
            Policy::WeightedRoundRobin => &self.weighted_round_robin,
            Policy::WeightedRoundRobinInterval => &self.weighted_round_robin_interval,
            Policy::SmoothWeightedRoundRobin => &self.smooth,
        }
    }

    /// Pick one backend with the given policy.
    ///
    /// `key` is only read by keyed policies (IP hash).
    pub fn select(
        &self,
        policy: Policy,
        key: Option<&str>,
    ) -> Result<Arc<Backend>, BalancerError> {
        if self.registry.is_empty() {
            tracing::debug!(policy = %policy, "Selection on empty pool");
            return Err(BalancerError::EmptyPool);
        }
        if policy.requires_key() && key.is_none() {
            return Err(BalancerError::MissingKey { policy });
        }

        let candidates = Candidates::new(&self.registry, self.filter);
        match self.strategy(policy).next_server(&candidates, key) {
            Some(backend) => {
                tracing::trace!(policy = %policy, backend = %backend.address(), "Backend selected");
                metrics::record_selection(policy, backend.address());
                Ok(backend)
            }
            None => {
                tracing::debug!(
                    policy = %policy,
                    backend_count = self.registry.len(),
                    "No healthy backends found"
                );
                for b in self.registry.all() {
                    tracing::debug!(addr = %b.address(), state = %b.health(), "Backend status");
                }
                Err(BalancerError::EmptyPool)
            }
        }
    }

    pub fn random(&self) -> Result<Arc<Backend>, BalancerError> {
        self.select(Policy::Random, None)
    }

    pub fn ip_hash(&self, key: &str) -> Result<Arc<Backend>, BalancerError> {
        self.select(Policy::IpHash, Some(key))
    }

    pub fn weighted_random(&self) -> Result<Arc<Backend>, BalancerError> {
        self.select(Policy::WeightedRandom, None)
    }

    pub fn weighted_random_interval(&self) -> Result<Arc<Backend>, BalancerError> {
        self.select(Policy::WeightedRandomInterval, None)
    }

    pub fn round_robin(&self) -> Result<Arc<Backend>, BalancerError> {
        self.select(Policy::RoundRobin, None)
    }

    pub fn weighted_round_robin(&self) -> Result<Arc<Backend>, BalancerError> {
        self.select(Policy::WeightedRoundRobin, None)
    }

    pub fn weighted_round_robin_interval(&self) -> Result<Arc<Backend>, BalancerError> {
        self.select(Policy::WeightedRoundRobinInterval, None)
    }

    pub fn smooth_weighted_round_robin(&self) -> Result<Arc<Backend>, BalancerError> {
        self.select(Policy::SmoothWeightedRoundRobin, None)
    }
}
