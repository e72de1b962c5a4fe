//! Configuration validation.
//!
//! Serde covers syntax; this covers value ranges and cross-field rules.
//! All problems are reported at once.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("backend #{index} has an empty address")]
    EmptyAddress { index: usize },

    #[error("backend {address} has weight 0, must be at least 1")]
    ZeroWeight { address: String },

    #[error("health check interval must be greater than zero")]
    ZeroInterval,

    #[error("health check timeout ({timeout_secs}s) must be below the interval ({interval_secs}s)")]
    TimeoutNotBelowInterval { timeout_secs: u64, interval_secs: u64 },

    #[error("health check thresholds must be at least 1")]
    ZeroThreshold,

    #[error("invalid metrics address: {0}")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    for (index, backend) in config.backends.iter().enumerate() {
        if backend.address.trim().is_empty() {
            errors.push(ValidationError::EmptyAddress { index });
        }
        if backend.weight == 0 {
            errors.push(ValidationError::ZeroWeight {
                address: backend.address.clone(),
            });
        }
    }

    let health = &config.health_check;
    if health.enabled {
        if health.interval_secs == 0 {
            errors.push(ValidationError::ZeroInterval);
        } else if health.timeout_secs >= health.interval_secs {
            errors.push(ValidationError::TimeoutNotBelowInterval {
                timeout_secs: health.timeout_secs,
                interval_secs: health.interval_secs,
            });
        }
        if health.healthy_threshold == 0 || health.unhealthy_threshold == 0 {
            errors.push(ValidationError::ZeroThreshold);
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BackendConfig;

    fn valid() -> BalancerConfig {
        let mut config = BalancerConfig::default();
        config.backends.push(BackendConfig {
            address: "http://localhost:9091".into(),
            weight: 3,
        });
        config
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.backends.push(BackendConfig {
            address: "".into(),
            weight: 0,
        });
        config.health_check.timeout_secs = 5;
        config.health_check.interval_secs = 5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyAddress { index: 1 },
                ValidationError::ZeroWeight { address: "".into() },
                ValidationError::TimeoutNotBelowInterval {
                    timeout_secs: 5,
                    interval_secs: 5
                },
            ]
        );
    }

    #[test]
    fn test_no_backends() {
        let errors = validate_config(&BalancerConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoBackends]);
    }

    #[test]
    fn test_disabled_health_check_skips_timing_rules() {
        let mut config = valid();
        config.health_check.enabled = false;
        config.health_check.interval_secs = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address() {
        let mut config = valid();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "not-an-address".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("not-an-address".into())]
        );
    }
}
