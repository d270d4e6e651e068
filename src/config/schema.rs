//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::limiter::policy::{AUTHENTICATED_CLASS, PRIVILEGED_CLASS};

/// Root configuration for the admission gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, client address handling).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Route and identity-class limiter policies.
    pub limiter: LimiterConfig,

    /// Daily bucket reclamation.
    pub quota_sweeper: QuotaSweeperConfig,

    /// Periodic session reclamation.
    pub session_sweeper: SessionSweeperConfig,

    /// Where the session id is read from.
    pub sessions: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Prefer `X-Real-IP` / `X-Forwarded-For` over the socket peer address.
    pub trust_proxy_headers: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_proxy_headers: false,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Burst size and refill rate for one route or identity class.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Maximum burst.
    pub capacity: f64,

    /// Tokens regenerated per minute.
    pub refill_per_minute: f64,
}

impl PolicyConfig {
    fn new(capacity: f64, refill_per_minute: f64) -> Self {
        Self {
            capacity,
            refill_per_minute,
        }
    }
}

/// Limiter policy tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Per-route policies keyed by `"METHOD /path"`. Routes not listed are
    /// unmetered.
    pub routes: BTreeMap<String, PolicyConfig>,

    /// Identity-class policies keyed by class name.
    pub classes: BTreeMap<String, PolicyConfig>,

    /// Roles that place an identity in the privileged class.
    pub privileged_roles: Vec<String>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        let routes = BTreeMap::from([
            ("POST /login".to_string(), PolicyConfig::new(5.0, 5.0)),
            ("POST /admin/login".to_string(), PolicyConfig::new(3.0, 3.0)),
        ]);
        let classes = BTreeMap::from([
            (AUTHENTICATED_CLASS.to_string(), PolicyConfig::new(100.0, 100.0)),
            (PRIVILEGED_CLASS.to_string(), PolicyConfig::new(500.0, 500.0)),
        ]);

        Self {
            routes,
            classes,
            privileged_roles: vec!["admin".to_string()],
        }
    }
}

/// Quota sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuotaSweeperConfig {
    /// Run the daily sweep.
    pub enabled: bool,

    /// Buckets idle this long before the scheduled sweep are dropped.
    pub retention_secs: u64,
}

impl Default for QuotaSweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_secs: 3600,
        }
    }
}

/// Session sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSweeperConfig {
    /// Run the periodic sweep.
    pub enabled: bool,

    /// Seconds between sweeps.
    pub interval_secs: u64,

    /// Sessions idle longer than this are deleted.
    pub retention_secs: u64,
}

impl Default for SessionSweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 660,
            retention_secs: 600,
        }
    }
}

/// Session id transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the session id.
    pub cookie_name: String,

    /// Header carrying the session id; checked before the cookie.
    pub header_name: String,

    /// Paths where a stale or unknown session falls back to anonymous so the
    /// user can sign in again.
    pub login_paths: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            header_name: "x-session-id".to_string(),
            login_paths: vec!["/login".to_string(), "/admin/login".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
