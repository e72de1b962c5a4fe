//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, Candidates, LoadBalancer};

/// Advance a cyclic cursor over `[0, len)` to the next eligible slot.
///
/// The read-scan-store sequence happens in one compare-and-swap, so concurrent
/// callers never consume the same slot. Returns the consumed slot.
fn advance_cursor(
    cursor: &AtomicUsize,
    len: usize,
    eligible: impl Fn(usize) -> bool,
) -> Option<usize> {
    if len == 0 {
        return None;
    }

    let mut chosen = None;
    cursor
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            let start = current % len;
            chosen = (0..len).map(|i| (start + i) % len).find(|&slot| eligible(slot));
            chosen.map(|slot| (slot + 1) % len)
        })
        .ok()?;
    chosen
}

/// Round-robin selector.
/// Stores a cursor into the registry and rotates through it in order.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position the next call starts from.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, candidates: &Candidates<'_>, _key: Option<&str>) -> Option<Arc<Backend>> {
        // DOWN backends (when filtered) are skipped without consuming a turn
        let position =
            advance_cursor(&self.cursor, candidates.len(), |p| candidates.is_eligible(p))?;
        candidates.backend(position).cloned()
    }
}
