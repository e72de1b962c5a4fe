//! Liveness probes.
//!
//! A probe answers one question for one backend: is it reachable right now?
//! Timeouts are applied by the caller, not by the probe.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Empty;
use hyper::header::USER_AGENT;
use hyper::{Method, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpStream;
use url::Url;

use crate::config::{HealthCheckConfig, ProbeKind};
use crate::load_balancer::Backend;

/// Why a probe failed. Only ever turned into a DOWN state, never returned to
/// selection callers.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("non-success status {0}")]
    Status(u16),

    #[error("invalid probe target {address}: {reason}")]
    InvalidTarget { address: String, reason: String },
}

/// A network liveness check against one backend.
#[async_trait]
pub trait Probe: Send + Sync + fmt::Debug {
    async fn probe(&self, backend: &Backend) -> Result<(), ProbeError>;
}

/// Build the probe described by the health check configuration.
pub fn from_config(config: &HealthCheckConfig) -> Arc<dyn Probe> {
    match config.probe {
        ProbeKind::Http => Arc::new(HttpProbe::new(config.path.clone())),
        ProbeKind::Tcp => Arc::new(TcpProbe),
    }
}

fn invalid(address: &str, reason: impl fmt::Display) -> ProbeError {
    ProbeError::InvalidTarget {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a backend address, treating bare `host:port` as plain HTTP.
fn backend_url(address: &str) -> Result<Url, ProbeError> {
    let raw = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    Url::parse(&raw).map_err(|e| invalid(address, e))
}

/// HTTP `GET` probe. Any 2xx response counts as healthy.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client<HttpConnector, Empty<Bytes>>,
    path: String,
}

impl HttpProbe {
    pub fn new(path: impl Into<String>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);

        // No pooling: every probe must open its own connection
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        Self {
            client,
            path: path.into(),
        }
    }

    /// URL probed for the given backend address.
    pub fn target(&self, address: &str) -> Result<Url, ProbeError> {
        let base = backend_url(address)?;
        if base.scheme() != "http" {
            return Err(invalid(address, "only http:// targets are probed over HTTP"));
        }
        if self.path.is_empty() {
            return Ok(base);
        }
        base.join(&self.path).map_err(|e| invalid(address, e))
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new("/")
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, backend: &Backend) -> Result<(), ProbeError> {
        let target = self.target(backend.address())?;

        let request = Request::builder()
            .method(Method::GET)
            .uri(target.as_str())
            .header(USER_AGENT, "balancer-core-health-check")
            .body(Empty::<Bytes>::new())
            .map_err(|e| invalid(backend.address(), e))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::Status(response.status().as_u16()))
        }
    }
}

/// TCP connect probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl TcpProbe {
    /// `host:port` to connect to. URL addresses use the scheme's default port
    /// when none is given.
    pub fn target(address: &str) -> Result<String, ProbeError> {
        if !address.contains("://") {
            return Ok(address.to_string());
        }
        let url = backend_url(address)?;
        let host = url.host_str().ok_or_else(|| invalid(address, "missing host"))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid(address, "missing port"))?;
        Ok(format!("{host}:{port}"))
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, backend: &Backend) -> Result<(), ProbeError> {
        let target = Self::target(backend.address())?;
        TcpStream::connect(target.as_str())
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;
        Ok(())
    }
}
