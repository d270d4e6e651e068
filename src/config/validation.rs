//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{GateConfig, LimiterConfig, PolicyConfig};
use crate::limiter::policy::{AUTHENTICATED_CLASS, PRIVILEGED_CLASS};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("route key {0:?} must look like \"METHOD /path\"")]
    MalformedRouteKey(String),

    #[error("policy {name:?}: {field} must be positive, got {value}")]
    NonPositive {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("identity class {0:?} is referenced but has no policy")]
    MissingClass(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("listener bind address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("metrics address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("admin API enabled with an empty api_key")]
    EmptyApiKey,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (key, policy) in &config.limiter.routes {
        if !is_route_key(key) {
            errors.push(ValidationError::MalformedRouteKey(key.clone()));
        }
        check_policy(key, policy, &mut errors);
    }
    for (class, policy) in &config.limiter.classes {
        check_policy(class, policy, &mut errors);
    }
    check_referenced_classes(&config.limiter, &mut errors);

    if config.session_sweeper.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval("session_sweeper.interval_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroInterval("timeouts.request_secs"));
    }

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::EmptyApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_policy(name: &str, policy: &PolicyConfig, errors: &mut Vec<ValidationError>) {
    for (field, value) in [
        ("capacity", policy.capacity),
        ("refill_per_minute", policy.refill_per_minute),
    ] {
        if !(value > 0.0) {
            errors.push(ValidationError::NonPositive {
                name: name.to_string(),
                field,
                value,
            });
        }
    }
}

/// Every identity without a privileged role lands in the authenticated
/// class; the privileged class is only reachable when roles map to it.
fn check_referenced_classes(limiter: &LimiterConfig, errors: &mut Vec<ValidationError>) {
    if !limiter.classes.contains_key(AUTHENTICATED_CLASS) {
        errors.push(ValidationError::MissingClass(AUTHENTICATED_CLASS));
    }
    if !limiter.privileged_roles.is_empty() && !limiter.classes.contains_key(PRIVILEGED_CLASS) {
        errors.push(ValidationError::MissingClass(PRIVILEGED_CLASS));
    }
}

fn is_route_key(key: &str) -> bool {
    let mut parts = key.split_whitespace();
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(method), Some(path), None)
            if method.chars().all(|c| c.is_ascii_alphabetic()) && path.starts_with('/')
    )
}
