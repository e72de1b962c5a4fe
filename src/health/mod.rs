//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! monitor.rs:
//!     Periodic timer (interval > probe timeout)
//!     → checker.rs (one round)
//!         → probe.rs for every backend, concurrently, each under the timeout
//!         → success: mark_success, failure/timeout: mark_failure
//!     → Backend health flips UP ↔ DOWN
//!
//! Selection reads the health atomics at any time; the view may be up to one
//! interval stale.
//! ```
//!
//! # Design Decisions
//! - Probe failures never escape this module; they only produce DOWN
//! - Thresholds default to 1, so a single result decides the state
//! - Health state is per-backend, not per-pool

pub mod checker;
pub mod monitor;
pub mod probe;

pub use checker::HealthChecker;
pub use monitor::HealthMonitor;
pub use probe::{HttpProbe, Probe, ProbeError, TcpProbe};
