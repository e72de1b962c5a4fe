//! Weighted round-robin load balancing strategies.
//!
//! Both variants visit backends in registration order, each repeated `weight`
//! times per cycle of length `total_weight` (3:1:1 gives A,A,A,B,C). They do
//! not interleave; see `smooth.rs` for that.
//!
//! - `WeightedRoundRobin` walks the precomputed weight index. This is the one
//!   to use in production.
//! - `WeightedRoundRobinInterval` keeps a cursor over `[0, total_weight)` and
//!   recomputes which interval contains it on every call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::load_balancer::{backend::Backend, Candidates, LoadBalancer};

/// Weighted round-robin over the expanded weight index.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    cursor: AtomicU64,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn next_server(&self, candidates: &Candidates<'_>, _key: Option<&str>) -> Option<Arc<Backend>> {
        let weights = candidates.weights();
        let total = weights.total_weight();
        if total == 0 {
            return None;
        }

        let mut chosen = None;
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                chosen = None;
                let mut slot = current % total;
                // An ineligible backend's remaining slots are skipped in one hop
                for _ in 0..candidates.len() {
                    let position = weights.position_of_slot(slot)?;
                    if candidates.is_eligible(position) {
                        chosen = Some(position);
                        return Some((slot + 1) % total);
                    }
                    slot = weights.next_interval_start(position)?;
                }
                None
            })
            .ok()?;
        candidates.backend(chosen?).cloned()
    }
}

/// Weighted round-robin that walks cumulative weight intervals.
#[derive(Debug, Default)]
pub struct WeightedRoundRobinInterval {
    cursor: Mutex<u64>,
}

impl WeightedRoundRobinInterval {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> u64 {
        *self.cursor.lock()
    }

    /// Find the interval holding `cursor` and the cursor value for the next call.
    ///
    /// On the last slot of a non-final interval the cursor steps forward by
    /// one instead of wrapping, so the next backend's first slot is not skipped.
    fn walk(prefix: &[u64], cursor: u64) -> Option<(usize, u64)> {
        let last = prefix.len().checked_sub(1)?;
        for (position, &sum) in prefix.iter().enumerate() {
            if cursor < sum {
                let next = if cursor == sum - 1 && position != last {
                    cursor + 1
                } else {
                    (cursor + 1) % sum
                };
                return Some((position, next));
            }
        }
        None
    }
}

impl LoadBalancer for WeightedRoundRobinInterval {
    fn next_server(&self, candidates: &Candidates<'_>, _key: Option<&str>) -> Option<Arc<Backend>> {
        let weights = candidates.weights();
        let total = weights.total_weight();
        if total == 0 {
            return None;
        }

        let mut cursor = self.cursor.lock();
        let mut point = *cursor % total;
        // One hop per backend; an ineligible backend's interval is skipped whole
        for _ in 0..candidates.len() {
            let (position, next) = Self::walk(weights.prefix_sums(), point)?;
            if candidates.is_eligible(position) {
                *cursor = next;
                return candidates.backend(position).cloned();
            }
            point = weights.next_interval_start(position)?;
        }
        None
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

    fn sequence(lb: &dyn LoadBalancer, candidates: &Candidates<'_>, n: usize) -> String {
        (0..n)
            .map(|_| lb.next_server(candidates, None).unwrap().address().to_string())
            .collect()
    }

    #[test]
    fn test_index_order() {
        let closed = build(&[3, 1, 1]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let lb = WeightedRoundRobin::new();
        assert_eq!(sequence(&lb, &candidates, 10), "AAABCAAABC");
        assert_eq!(lb.cursor(), 0);
    }

    #[test]
    fn test_interval_order_matches_index() {
        let closed = build(&[3, 1, 1]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let lb = WeightedRoundRobinInterval::new();
        assert_eq!(sequence(&lb, &candidates, 10), "AAABCAAABC");
        assert_eq!(lb.cursor(), 0);

        let closed = build(&[1, 2, 1, 3]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let index = sequence(&WeightedRoundRobin::new(), &candidates, 14);
        let interval = sequence(&WeightedRoundRobinInterval::new(), &candidates, 14);
        assert_eq!(index, "ABBCDDDABBCDDD");
        assert_eq!(index, interval);
    }

    #[test]
    fn test_walk_boundaries() {
        let prefix = [3, 4, 5];
        assert_eq!(WeightedRoundRobinInterval::walk(&prefix, 0), Some((0, 1)));
        assert_eq!(WeightedRoundRobinInterval::walk(&prefix, 2), Some((0, 3)));
        assert_eq!(WeightedRoundRobinInterval::walk(&prefix, 3), Some((1, 4)));
        assert_eq!(WeightedRoundRobinInterval::walk(&prefix, 4), Some((2, 0)));
        assert_eq!(WeightedRoundRobinInterval::walk(&prefix, 5), None);
        assert_eq!(WeightedRoundRobinInterval::walk(&[], 0), None);
    }

    #[test]
    fn test_skips_down_backends() {
        let closed = build(&[3, 1, 1]);
        closed.all()[0].set_health(HealthState::Down);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);

        assert_eq!(sequence(&WeightedRoundRobin::new(), &candidates, 4), "BCBC");
        assert_eq!(sequence(&WeightedRoundRobinInterval::new(), &candidates, 4), "BCBC");
    }

    #[test]
    fn test_all_down_keeps_cursor() {
        let closed = build(&[3, 1, 1]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let lb = WeightedRoundRobinInterval::new();
        sequence(&lb, &candidates, 2);

        for b in closed.all() {
            b.set_health(HealthState::Down);
        }
        assert!(lb.next_server(&candidates, None).is_none());
        assert_eq!(lb.cursor(), 2);
        assert!(WeightedRoundRobin::new().next_server(&candidates, None).is_none());
    }

    #[test]
    fn test_large_down_backend_skipped_in_one_hop() {
        let closed = build(&[2_000_000_000, 2_000_000_000, 1]);
        closed.all()[0].set_health(HealthState::Down);
        closed.all()[1].set_health(HealthState::Down);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);

        let started = std::time::Instant::now();
        assert_eq!(sequence(&WeightedRoundRobin::new(), &candidates, 3), "CCC");
        assert_eq!(sequence(&WeightedRoundRobinInterval::new(), &candidates, 3), "CCC");

        closed.all()[2].set_health(HealthState::Down);
        assert!(WeightedRoundRobin::new().next_server(&candidates, None).is_none());
        assert!(WeightedRoundRobinInterval::new().next_server(&candidates, None).is_none());
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_skip_resumes_after_down_interval() {
        let closed = build(&[3, 2, 1]);
        let candidates = Candidates::new(&closed, HealthFilter::UpOnly);
        let index = WeightedRoundRobin::new();
        let interval = WeightedRoundRobinInterval::new();
        assert_eq!(sequence(&index, &candidates, 1), "A");
        assert_eq!(sequence(&interval, &candidates, 1), "A");

        closed.all()[0].set_health(HealthState::Down);
        assert_eq!(sequence(&index, &candidates, 4), "BBCB");
        assert_eq!(sequence(&interval, &candidates, 4), "BBCB");
        assert_eq!(index.cursor(), 4);
        assert_eq!(interval.cursor(), 4);
    }
}
