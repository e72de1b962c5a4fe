//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Hold its static weight
//! - Track health state (Up/Down) written by the health checker

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Liveness of a backend as last decided by the health checker. Backends
/// start `Up`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Up = 0,
    Down = 1,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Down,
            _ => HealthState::Up,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Up => f.write_str("UP"),
            HealthState::Down => f.write_str("DOWN"),
        }
    }
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Opaque connection target (`host:port` or a URL).
    address: String,
    /// Static weight, at least 1.
    weight: u32,

    /// Current health state.
    state: AtomicU8,
    /// Consecutive failure count.
    consecutive_failures: AtomicUsize,
    /// Consecutive success count.
    consecutive_successes: AtomicUsize,
}

impl Backend {
    /// Create a new backend. Backends start out `Up`.
    ///
    /// Weight is not validated here; `Registry::register` rejects zero weights.
    pub fn new(address: impl Into<String>, weight: u32) -> Self {
        Self {
            address: address.into(),
            weight,
            state: AtomicU8::new(HealthState::Up as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Current health as last observed by the checker.
    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_up(&self) -> bool {
        self.health() == HealthState::Up
    }

    /// Force a health state, resetting the hysteresis counters.
    pub fn set_health(&self, state: HealthState) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);
        self.state.store(state as u8, Ordering::Release);
    }

    // --- Health Logic ---

    /// Report a successful probe.
    ///
    /// Returns `true` when this report flipped the backend to `Up`.
    pub fn mark_success(&self, healthy_threshold: usize) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.is_up() {
            return false;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold.max(1) {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Up as u8, Ordering::Release);
            return true;
        }
        false
    }

    /// Report a failed probe.
    ///
    /// Returns `true` when this report flipped the backend to `Down`.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> bool {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if !self.is_up() {
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold.max(1) {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Down as u8, Ordering::Release);
            return true;
        }
        false
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (weight {}, {})", self.address, self.weight, self.health())
    }
}
