//! Client-key hash load balancing strategy.
//!
//! The key (usually the client IP) is hashed with CRC-32 (IEEE) and reduced
//! modulo the backend count. Changing the backend count may move keys.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, Candidates, LoadBalancer};

/// Stable hash of a client key.
pub fn hash_key(key: &str) -> u32 {
    crc32fast::hash(key.as_bytes())
}

/// IP hash selector.
#[derive(Debug, Default)]
pub struct IpHash;

impl IpHash {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for IpHash {
    fn next_server(&self, candidates: &Candidates<'_>, key: Option<&str>) -> Option<Arc<Backend>> {
        let key = key?;
        if candidates.is_empty() {
            return None;
        }

        let hash = hash_key(key) as usize;
        let index = hash % candidates.len();
        if candidates.is_eligible(index) {
            return candidates.backend(index).cloned();
        }

        // Primary target filtered out: spread its keys over the survivors
        let eligible = candidates.eligible_positions();
        if eligible.is_empty() {
            return None;
        }
        candidates.backend(eligible[hash % eligible.len()]).cloned()
    }
}
