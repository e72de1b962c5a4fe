//! balancer-core host binary.
//!
//! Loads a TOML configuration, builds the backend pool and keeps backend
//! health current until asked to stop. The request listener and proxying
//! live elsewhere; `simulate` shows what the selector would do.
//!
//! ```text
//!   config.toml ──▶ loader ──▶ BackendPool ──▶ select_backend(policy, key)
//!                                  │
//!                                  ▼
//!                            HealthMonitor ──▶ probe every backend each tick
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use balancer_core::config::{self, BalancerConfig};
use balancer_core::lifecycle::{self, signals, Shutdown};
use balancer_core::load_balancer::{BackendPool, Policy};
use balancer_core::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "balancer-core")]
#[command(about = "Backend selection engine with active health checks", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "balancer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor backend health until SIGINT/SIGTERM (default)
    Run,
    /// Run selections against the configured pool and print the result
    Simulate {
        /// Policy to use instead of the configured one
        #[arg(short, long)]
        policy: Option<Policy>,

        /// Number of selections
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        /// Client key for ip-hash
        #[arg(short, long)]
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!("balancer-core v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        path = %cli.config.display(),
        backends = config.backends.len(),
        policy = %config.selection.policy,
        health_filter = ?config.selection.health_filter,
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Simulate { policy, count, key } => {
            simulate(&config, policy, count, key.as_deref())
        }
    }
}

async fn run(config: BalancerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    let started = lifecycle::start(&config, &shutdown)?;

    signals::shutdown_signal().await;
    shutdown.trigger();

    if let Some(monitor) = started.health_monitor {
        monitor.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn simulate(
    config: &BalancerConfig,
    policy: Option<Policy>,
    count: usize,
    key: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = BackendPool::from_config(config)?;
    let policy = policy.unwrap_or(pool.default_policy());

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for i in 0..count {
        let backend = pool.select_backend(policy, key)?;
        println!("{:>4}  {}", i + 1, backend.address());
        *counts.entry(backend.address().to_string()).or_default() += 1;
    }

    println!();
    println!("policy: {policy}");
    for backend in pool.backends() {
        let n = counts.get(backend.address()).copied().unwrap_or(0);
        println!(
            "{:<32} weight {:>3}  selected {:>6} ({:.1}%)",
            backend.address(),
            backend.weight(),
            n,
            100.0 * n as f64 / count.max(1) as f64
        );
    }
    Ok(())
}
