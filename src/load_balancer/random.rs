//! Uniform random load balancing strategy.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::load_balancer::{backend::Backend, Candidates, LoadBalancer};

/// Random selector.
/// Ignores weight; every eligible backend is equally likely.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn next_server(&self, candidates: &Candidates<'_>, _key: Option<&str>) -> Option<Arc<Backend>> {
        if candidates.is_empty() {
            return None;
        }

        // Thread-local generator, seeded once per thread
        let mut rng = rand::thread_rng();

        if candidates.all_eligible() {
            let index = rng.gen_range(0..candidates.len());
            return candidates.backend(index).cloned();
        }

        candidates
            .eligible_positions()
            .choose(&mut rng)
            .and_then(|&p| candidates.backend(p))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::{HealthFilter, HealthState, Registry};

    #[test]
    fn test_random_covers_all_backends() {
        let mut registry = Registry::new();
        for port in 8080..8083 {
            registry.register(format!("127.0.0.1:{port}"), 1).unwrap();
        }
        let closed = registry.close();
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);

        let lb = Random::new();
        let mut seen = [0usize; 3];
        for _ in 0..3000 {
            let b = lb.next_server(&candidates, None).unwrap();
            let pos = closed.all().iter().position(|x| Arc::ptr_eq(x, &b)).unwrap();
            seen[pos] += 1;
        }
        assert!(seen.iter().all(|&c| c > 800), "skewed distribution: {seen:?}");
    }

    #[test]
    fn test_random_skips_down() {
        let mut registry = Registry::new();
        let down = registry.register("127.0.0.1:8080", 1).unwrap();
        registry.register("127.0.0.1:8081", 1).unwrap();
        let closed = registry.close();
        down.set_health(HealthState::Down);

        let lb = Random::new();
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        for _ in 0..100 {
            assert_eq!(lb.next_server(&candidates, None).unwrap().address(), "127.0.0.1:8081");
        }

        let unfiltered = Candidates::new(&closed, HealthFilter::Ignore);
        let picked_down = (0..200)
            .filter_map(|_| lb.next_server(&unfiltered, None))
            .any(|b| Arc::ptr_eq(&b, &down));
        assert!(picked_down);
    }

    #[test]
    fn test_random_empty() {
        let closed = Registry::new().close();
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        assert!(Random::new().next_server(&candidates, None).is_none());
    }
}
