//! Weighted random load balancing strategies.
//!
//! Both variants pick a backend with probability `weight / total_weight`:
//! - `WeightedRandom` draws a slot from the expanded weight index (a binary
//!   search stands in for it once the total weight is too large to expand).
//! - `WeightedRandomInterval` draws a point in `[0, total_weight)` and finds
//!   the backend whose cumulative weight interval contains it. Prefer it when
//!   the total weight is large compared to the backend count.

use std::sync::Arc;

use rand::Rng;

use crate::load_balancer::{backend::Backend, Candidates, LoadBalancer};

/// Weighted random selector over the precomputed weight index.
#[derive(Debug, Default)]
pub struct WeightedRandom;

impl WeightedRandom {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for WeightedRandom {
    fn next_server(&self, candidates: &Candidates<'_>, _key: Option<&str>) -> Option<Arc<Backend>> {
        let mut rng = rand::thread_rng();

        if candidates.all_eligible() {
            let weights = candidates.weights();
            if weights.total_weight() == 0 {
                return None;
            }
            let slot = rng.gen_range(0..weights.total_weight());
            return weights
                .position_of_slot(slot)
                .and_then(|p| candidates.backend(p))
                .cloned();
        }

        // The index covers every backend; draw over the eligible weights instead
        draw_eligible(candidates, &mut rng)
    }
}

/// Weighted random selector using cumulative weight intervals.
#[derive(Debug, Default)]
pub struct WeightedRandomInterval;

impl WeightedRandomInterval {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for WeightedRandomInterval {
    fn next_server(&self, candidates: &Candidates<'_>, _key: Option<&str>) -> Option<Arc<Backend>> {
        let mut rng = rand::thread_rng();

        if candidates.all_eligible() {
            let weights = candidates.weights();
            if weights.total_weight() == 0 {
                return None;
            }
            let point = rng.gen_range(0..weights.total_weight());
            return weights
                .position_for(point)
                .and_then(|p| candidates.backend(p))
                .cloned();
        }

        draw_eligible(candidates, &mut rng)
    }
}

/// Interval draw restricted to eligible backends.
fn draw_eligible<R: Rng>(candidates: &Candidates<'_>, rng: &mut R) -> Option<Arc<Backend>> {
    let eligible = candidates.eligible_positions();
    let total: u64 = eligible
        .iter()
        .filter_map(|&p| candidates.backend(p))
        .map(|b| u64::from(b.weight()))
        .sum();
    if total == 0 {
        return None;
    }

    let point = rng.gen_range(0..total);
    let mut sum = 0u64;
    for position in eligible {
        let backend = candidates.backend(position)?;
        sum += u64::from(backend.weight());
        if point < sum {
            return Some(backend.clone());
        }
    }
    None
}
