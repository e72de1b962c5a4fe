//! Smooth weighted round-robin load balancing strategy.
//!
//! Each call adds every candidate's weight to its current weight, picks the
//! highest current weight (earliest registered wins ties), then subtracts the
//! candidates' total weight from the winner. Weights 3:1:1 yield A,B,A,C,A
//! instead of the bursty A,A,A,B,C.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::load_balancer::{backend::Backend, Candidates, LoadBalancer};

/// Smooth weighted round-robin selector.
///
/// Current weights live here, one per registry position, and are only touched
/// while the lock is held for the whole add/select/subtract sequence.
#[derive(Debug, Default)]
pub struct SmoothWeightedRoundRobin {
    current: Mutex<Vec<i64>>,
}

impl SmoothWeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current weights, in registration order.
    pub fn current_weights(&self) -> Vec<i64> {
        self.current.lock().clone()
    }
}

impl LoadBalancer for SmoothWeightedRoundRobin {
    fn next_server(&self, candidates: &Candidates<'_>, _key: Option<&str>) -> Option<Arc<Backend>> {
        let backends = candidates.backends();
        let mut current = self.current.lock();
        if current.len() != backends.len() {
            current.resize(backends.len(), 0);
        }

        let mut total = 0i64;
        let mut best: Option<usize> = None;
        for (position, backend) in backends.iter().enumerate() {
            if !candidates.is_eligible(position) {
                continue;
            }
            let weight = i64::from(backend.weight());
            current[position] += weight;
            total += weight;

            // Strictly greater keeps the earliest position on ties
            match best {
                Some(b) if current[position] <= current[b] => {}
                _ => best = Some(position),
            }
        }

        let best = best?;
        current[best] -= total;
        candidates.backend(best).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::{ClosedRegistry, HealthFilter, HealthState, Registry};

    fn build(weights: &[u32]) -> ClosedRegistry {
        let mut registry = Registry::new();
        for (name, w) in ["A", "B", "C", "D"].iter().zip(weights) {
            registry.register(*name, *w).unwrap();
        }
        registry.close()
    }

    fn sequence(lb: &SmoothWeightedRoundRobin, candidates: &Candidates<'_>, n: usize) -> String {
        (0..n)
            .map(|_| lb.next_server(candidates, None).unwrap().address().to_string())
            .collect()
    }

    #[test]
    fn test_interleaves() {
        let closed = build(&[3, 1, 1]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let lb = SmoothWeightedRoundRobin::new();

        assert_eq!(sequence(&lb, &candidates, 5), "ABACA");
        // One full cycle returns every current weight to zero
        assert_eq!(lb.current_weights(), vec![0, 0, 0]);
        assert_eq!(sequence(&lb, &candidates, 5), "ABACA");
    }

    #[test]
    fn test_current_weights_after_each_step() {
        let closed = build(&[3, 1, 1]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let lb = SmoothWeightedRoundRobin::new();

        lb.next_server(&candidates, None);
        assert_eq!(lb.current_weights(), vec![-2, 1, 1]);
        lb.next_server(&candidates, None);
        assert_eq!(lb.current_weights(), vec![1, -3, 2]);
        lb.next_server(&candidates, None);
        assert_eq!(lb.current_weights(), vec![-1, -2, 3]);
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let closed = build(&[1, 1, 1]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let lb = SmoothWeightedRoundRobin::new();
        assert_eq!(sequence(&lb, &candidates, 6), "ABCABC");
    }

    #[test]
    fn test_frequency_matches_weights() {
        let closed = build(&[5, 2, 2, 1]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let lb = SmoothWeightedRoundRobin::new();
        let seq = sequence(&lb, &candidates, 100);
        assert_eq!(seq.matches('A').count(), 50);
        assert_eq!(seq.matches('B').count(), 20);
        assert_eq!(seq.matches('C').count(), 20);
        assert_eq!(seq.matches('D').count(), 10);
        // Never more than two A's in a row
        assert!(!seq.contains("AAA"));
    }

    #[test]
    fn test_down_backend_sits_out() {
        let closed = build(&[3, 1, 1]);
        closed.all()[0].set_health(HealthState::Down);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let lb = SmoothWeightedRoundRobin::new();
        assert_eq!(sequence(&lb, &candidates, 4), "BCBC");
        assert_eq!(lb.current_weights()[0], 0);

        closed.all()[1].set_health(HealthState::Down);
        closed.all()[2].set_health(HealthState::Down);
        assert!(lb.next_server(&candidates, None).is_none());
    }
}
