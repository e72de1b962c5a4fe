//! Selection and registration errors.

use thiserror::Error;

use crate::load_balancer::Policy;

/// Errors surfaced to callers of the load balancer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalancerError {
    /// No backend (or no UP backend, when filtering on health) to pick from.
    #[error("no backend available for selection")]
    EmptyPool,

    /// Registration with a weight the weighted policies cannot use.
    #[error("backend {address} has invalid weight {weight}, must be at least 1")]
    InvalidWeight { address: String, weight: u32 },

    /// Registration with an empty address.
    #[error("backend address must not be empty")]
    InvalidAddress,

    /// A keyed policy was invoked without a key.
    #[error("policy {policy} requires a client key")]
    MissingKey { policy: Policy },
}
