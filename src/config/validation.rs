//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, windows > 0, ports valid)
//! - Check upstream URLs are absolute http(s) URLs
//! - Keep the request timeout above the slowest retried fan-out, so a
//!   degraded profile is never cut off mid-flight
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("upstream '{name}' has invalid url '{url}'")]
    UpstreamUrl { name: &'static str, url: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("timeouts.request_secs ({request_secs}s) must exceed slowest profile ({slowest:?})")]
    RequestTimeoutTooShort { request_secs: u64, slowest: Duration },

    #[error("auth is enabled but api_key is empty")]
    EmptyApiKey,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let upstreams = [
        ("user", &config.upstreams.user_url),
        ("order", &config.upstreams.order_url),
        ("product", &config.upstreams.product_url),
        ("recommendation", &config.upstreams.recommendation_url),
    ];
    for (name, url) in upstreams {
        let valid = Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::UpstreamUrl {
                name,
                url: url.clone(),
            });
        }
    }

    let mut require_positive = |field: &'static str, value: u64| {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    };
    require_positive("timeouts.upstream_secs", config.timeouts.upstream_secs);
    require_positive("timeouts.request_secs", config.timeouts.request_secs);
    require_positive("retries.max_attempts", config.retries.max_attempts as u64);
    require_positive(
        "breaker.failure_threshold",
        config.breaker.failure_threshold as u64,
    );
    if config.rate_limit.enabled {
        require_positive("rate_limit.max_requests", config.rate_limit.max_requests);
        require_positive("rate_limit.window_secs", config.rate_limit.window_secs);
    }
    if config.cache.enabled {
        require_positive("cache.ttl_secs", config.cache.ttl_secs);
    }

    let slowest = config.slowest_profile();
    if config.timeouts.request() <= slowest {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: config.timeouts.request_secs,
            slowest,
        });
    }

    if config.auth.enabled && config.auth.api_key.is_empty() {
        errors.push(ValidationError::EmptyApiKey);
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

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.upstreams.order_url = "ftp://orders".into();
        config.retries.max_attempts = 0;
        config.auth.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::BindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::UpstreamUrl {
            name: "order",
            url: "ftp://orders".into(),
        }));
        assert!(errors.contains(&ValidationError::Zero {
            field: "retries.max_attempts"
        }));
        assert!(errors.contains(&ValidationError::EmptyApiKey));
    }

    #[test]
    fn test_request_timeout_must_cover_slowest_profile() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 30;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::RequestTimeoutTooShort {
                request_secs: 30,
                slowest: Duration::from_secs(32),
            }]
        );

        config.retries.max_attempts = 2;
        config.retries.delay_ms = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_disabled_features_skip_range_checks() {
        let mut config = GatewayConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 0;
        config.cache.enabled = false;
        config.cache.ttl_secs = 0;

        assert!(validate_config(&config).is_ok());
    }
}
