//! Backend registry and derived weight data.
//!
//! # Responsibilities
//! - Keep backends in registration order
//! - Reject backends the weighted policies cannot handle
//! - Build the prefix sums when the registry is closed; the expanded slot
//!   index only on first use, and only while the total weight is bounded

use std::sync::{Arc, OnceLock};

use crate::load_balancer::backend::Backend;
use crate::load_balancer::error::BalancerError;

/// Ordered set of backends, open for additions during startup.
#[derive(Debug, Default)]
pub struct Registry {
    backends: Vec<Arc<Backend>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already constructed backend.
    pub fn add(&mut self, backend: Arc<Backend>) -> Result<(), BalancerError> {
        if backend.address().trim().is_empty() {
            return Err(BalancerError::InvalidAddress);
        }
        if backend.weight() == 0 {
            return Err(BalancerError::InvalidWeight {
                address: backend.address().to_string(),
                weight: backend.weight(),
            });
        }

        tracing::debug!(
            address = %backend.address(),
            weight = backend.weight(),
            position = self.backends.len(),
            "Backend registered"
        );
        self.backends.push(backend);
        Ok(())
    }

    /// Create and append a backend.
    pub fn register(
        &mut self,
        address: impl Into<String>,
        weight: u32,
    ) -> Result<Arc<Backend>, BalancerError> {
        let backend = Arc::new(Backend::new(address, weight));
        self.add(backend.clone())?;
        Ok(backend)
    }

    /// All backends in registration order.
    pub fn all(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// End the append-only phase and compute derived weight data.
    pub fn close(self) -> ClosedRegistry {
        let index = WeightIndex::build(&self.backends);
        tracing::debug!(
            backends = self.backends.len(),
            total_weight = index.total_weight(),
            "Registry closed"
        );
        ClosedRegistry {
            backends: self.backends,
            index,
        }
    }
}

/// Registry whose membership can no longer change.
#[derive(Debug)]
pub struct ClosedRegistry {
    backends: Vec<Arc<Backend>>,
    index: WeightIndex,
}

impl ClosedRegistry {
    pub fn all(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn get(&self, position: usize) -> Option<&Arc<Backend>> {
        self.backends.get(position)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn weights(&self) -> &WeightIndex {
        &self.index
    }
}

/// Largest total weight for which the per-slot index is materialised.
///
/// Above this the slot lookups fall back to a binary search over the prefix
/// sums, which yields the same position for every slot.
pub const MAX_EXPANDED_SLOTS: u64 = 1 << 20;

/// Weight data derived from a closed registry.
#[derive(Debug, Clone, Default)]
pub struct WeightIndex {
    /// Cumulative weights; `prefix[i]` is the sum of weights `0..=i`.
    prefix: Vec<u64>,
    total: u64,
    /// Each backend position repeated `weight` times, built on first use.
    slots: OnceLock<Vec<usize>>,
}

impl WeightIndex {
    pub fn build(backends: &[Arc<Backend>]) -> Self {
        let mut prefix = Vec::with_capacity(backends.len());
        let mut total = 0u64;

        for backend in backends {
            // Zero weights never make it past registration
            total += u64::from(backend.weight());
            prefix.push(total);
        }

        Self {
            prefix,
            total,
            slots: OnceLock::new(),
        }
    }

    /// The expanded slot index, or `None` when the total weight is above
    /// [`MAX_EXPANDED_SLOTS`].
    pub fn slots(&self) -> Option<&[usize]> {
        if self.total > MAX_EXPANDED_SLOTS {
            return None;
        }
        let slots = self.slots.get_or_init(|| {
            let mut slots = Vec::with_capacity(self.total as usize);
            let mut start = 0u64;
            for (position, &end) in self.prefix.iter().enumerate() {
                slots.extend(std::iter::repeat(position).take((end - start) as usize));
                start = end;
            }
            slots
        });
        Some(slots)
    }

    pub fn prefix_sums(&self) -> &[u64] {
        &self.prefix
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    /// Position of the backend whose interval contains `point`.
    pub fn position_for(&self, point: u64) -> Option<usize> {
        if point >= self.total {
            return None;
        }
        // First cumulative sum strictly greater than the point
        Some(self.prefix.partition_point(|&sum| sum <= point))
    }

    /// Position owning weight slot `slot`, read from the expanded index when
    /// there is one.
    pub fn position_of_slot(&self, slot: u64) -> Option<usize> {
        match self.slots() {
            Some(slots) => slots.get(usize::try_from(slot).ok()?).copied(),
            None => self.position_for(slot),
        }
    }

    /// First slot after the interval of `position`, wrapped to zero at the end.
    pub fn next_interval_start(&self, position: usize) -> Option<u64> {
        let end = *self.prefix.get(position)?;
        Some(if end >= self.total { 0 } else { end })
    }
}
