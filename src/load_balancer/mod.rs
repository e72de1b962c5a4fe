//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     registry.rs (register backends, reject bad weights)
//!     → close registry (prefix sums; slot index on first use)
//!     → selector.rs (owns closed registry + per-policy state)
//!
//! Per request:
//!     pool.rs select_backend(policy, key)
//!     → Candidates (registry view, health filter applied)
//!     → Apply policy:
//!         - random.rs / ip_hash.rs (stateless)
//!         - weighted_random.rs (index or interval draw)
//!         - round_robin.rs / weighted_round_robin.rs (cyclic cursors)
//!         - smooth.rs (interleaved weighted rotation)
//!     → Arc<Backend> or BalancerError::EmptyPool
//! ```
//!
//! # Design Decisions
//! - Registry membership is fixed once closed; health is the only moving part
//! - Each policy keeps its own state, so mixing policies never disturbs a cursor
//! - Health filtering is a pool setting, applied the same way to every policy

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod error;
pub mod ip_hash;
pub mod pool;
pub mod random;
pub mod registry;
pub mod round_robin;
pub mod selector;
pub mod smooth;
pub mod weighted_random;
pub mod weighted_round_robin;

pub use backend::{Backend, HealthState};
pub use error::BalancerError;
pub use pool::{BackendPool, PoolBuilder};
pub use registry::{ClosedRegistry, Registry, WeightIndex};
pub use selector::Selector;

/// A selection algorithm.
///
/// Implementations return `None` when no candidate is eligible.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    fn next_server(&self, candidates: &Candidates<'_>, key: Option<&str>) -> Option<Arc<Backend>>;
}

/// Selection policies understood by the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    Random,
    IpHash,
    WeightedRandom,
    WeightedRandomInterval,
    RoundRobin,
    WeightedRoundRobin,
    WeightedRoundRobinInterval,
    #[default]
    SmoothWeightedRoundRobin,
}

impl Policy {
    pub const ALL: [Policy; 8] = [
        Policy::Random,
        Policy::IpHash,
        Policy::WeightedRandom,
        Policy::WeightedRandomInterval,
        Policy::RoundRobin,
        Policy::WeightedRoundRobin,
        Policy::WeightedRoundRobinInterval,
        Policy::SmoothWeightedRoundRobin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Random => "random",
            Policy::IpHash => "ip-hash",
            Policy::WeightedRandom => "weighted-random",
            Policy::WeightedRandomInterval => "weighted-random-interval",
            Policy::RoundRobin => "round-robin",
            Policy::WeightedRoundRobin => "weighted-round-robin",
            Policy::WeightedRoundRobinInterval => "weighted-round-robin-interval",
            Policy::SmoothWeightedRoundRobin => "smooth-weighted-round-robin",
        }
    }

    /// Whether the policy needs a client key (e.g. source IP).
    pub fn requires_key(&self) -> bool {
        matches!(self, Policy::IpHash)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Policy::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown policy: {s}"))
    }
}

/// How selection treats backends the health checker marked DOWN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthFilter {
    /// DOWN backends stay selectable.
    Ignore,
    /// Only UP backends are candidates.
    #[default]
    UpOnly,
}

/// Read-only view of the registry handed to a policy.
#[derive(Debug, Clone, Copy)]
pub struct Candidates<'a> {
    registry: &'a ClosedRegistry,
    filter: HealthFilter,
}

impl<'a> Candidates<'a> {
    pub fn new(registry: &'a ClosedRegistry, filter: HealthFilter) -> Self {
        Self { registry, filter }
    }

    /// Number of registered backends, eligible or not.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn backends(&self) -> &'a [Arc<Backend>] {
        self.registry.all()
    }

    pub fn backend(&self, position: usize) -> Option<&'a Arc<Backend>> {
        self.registry.get(position)
    }

    pub fn weights(&self) -> &'a WeightIndex {
        self.registry.weights()
    }

    pub fn is_eligible(&self, position: usize) -> bool {
        match self.filter {
            HealthFilter::Ignore => position < self.registry.len(),
            HealthFilter::UpOnly => self.registry.get(position).is_some_and(|b| b.is_up()),
        }
    }

    /// True when no backend is filtered out, so precomputed data applies as is.
    pub fn all_eligible(&self) -> bool {
        match self.filter {
            HealthFilter::Ignore => true,
            HealthFilter::UpOnly => self.registry.all().iter().all(|b| b.is_up()),
        }
    }

    /// Positions of eligible backends in registration order.
    pub fn eligible_positions(&self) -> Vec<usize> {
        (0..self.registry.len()).filter(|&p| self.is_eligible(p)).collect()
    }
}
