//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Selector and health checker produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric calls are no-ops until an exporter is installed
//! - Log level from RUST_LOG, falling back to the configured level

pub mod logging;
pub mod metrics;
