//! Startup orchestration.
//!
//! Config is already loaded and validated; this builds the pool and starts
//! the background health monitor in that order.

use tokio::task::JoinHandle;

use crate::config::BalancerConfig;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{BackendPool, BalancerError};

/// Everything a host needs after startup.
#[derive(Debug)]
pub struct Started {
    pub pool: BackendPool,
    /// `None` when active health checks are disabled.
    pub health_monitor: Option<JoinHandle<()>>,
}

/// Build the pool and, if enabled, start health monitoring.
///
/// Any registration error is fatal.
pub fn start(config: &BalancerConfig, shutdown: &Shutdown) -> Result<Started, BalancerError> {
    let pool = BackendPool::from_config(config)?;

    let health_monitor = if config.health_check.enabled {
        Some(pool.start_health_monitoring_with(&config.health_check, shutdown.subscribe()))
    } else {
        tracing::info!("Active health checks disabled");
        None
    };

    Ok(Started {
        pool,
        health_monitor,
    })
}
