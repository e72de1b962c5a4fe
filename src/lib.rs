//! Backend selection engine for a load balancer.
//!
//! Given a pool of weighted backends, picks the one that should serve the
//! next request using one of several policies, and keeps each backend's
//! UP/DOWN state current with periodic out-of-band probes.
//!
//! ```no_run
//! use std::time::Duration;
//! use balancer_core::{BackendPool, Policy, Shutdown};
//!
//! # async fn example() -> Result<(), balancer_core::BalancerError> {
//! let mut builder = BackendPool::builder();
//! builder.register_backend("http://localhost:9091", 3)?;
//! builder.register_backend("http://localhost:9092", 1)?;
//! builder.register_backend("http://localhost:9093", 1)?;
//! let pool = builder.build();
//!
//! let shutdown = Shutdown::new();
//! let monitor = pool.start_health_monitoring(
//!     Duration::from_secs(3),
//!     Duration::from_secs(2),
//!     shutdown.subscribe(),
//! );
//!
//! let backend = pool.select_backend(Policy::SmoothWeightedRoundRobin, None)?;
//! println!("forwarding to {}", backend.address());
//!
//! shutdown.trigger();
//! let _ = monitor.await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use lifecycle::Shutdown;
pub use load_balancer::{Backend, BackendPool, BalancerError, HealthFilter, HealthState, Policy};
