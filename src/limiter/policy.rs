//! Limiter policies and their lookup table.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::schema::{LimiterConfig, PolicyConfig};

/// Class applied to any authenticated identity without an elevated role.
pub const AUTHENTICATED_CLASS: &str = "authenticated-user";

/// Class applied to identities holding one of the privileged roles.
pub const PRIVILEGED_CLASS: &str = "privileged-user";

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Errors raised when building a policy.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("rate must be positive, got {0}")]
    NonPositiveRate(f64),

    #[error("capacity must be positive, got {0}")]
    NonPositiveCapacity(f64),
}

/// Refill rate and burst size for one identity class or route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Policy {
    rate_per_ms: f64,
    capacity: f64,
}

impl Policy {
    pub fn new(rate_per_ms: f64, capacity: f64) -> Result<Self, PolicyError> {
        // Written as negations so NaN is rejected too.
        if !(rate_per_ms > 0.0) {
            return Err(PolicyError::NonPositiveRate(rate_per_ms));
        }
        if !(capacity > 0.0) {
            return Err(PolicyError::NonPositiveCapacity(capacity));
        }
        Ok(Self {
            rate_per_ms,
            capacity,
        })
    }

    /// Build a policy from a burst size and a per-minute refill count.
    pub fn per_minute(capacity: f64, refill_per_minute: f64) -> Result<Self, PolicyError> {
        Self::new(refill_per_minute / MILLIS_PER_MINUTE, capacity)
    }

    pub fn rate_per_ms(&self) -> f64 {
        self.rate_per_ms
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}

impl TryFrom<&PolicyConfig> for Policy {
    type Error = PolicyError;

    fn try_from(config: &PolicyConfig) -> Result<Self, Self::Error> {
        Self::per_minute(config.capacity, config.refill_per_minute)
    }
}

/// `"METHOD path"`, the key used by the route policy table.
pub fn route_descriptor(method: &str, path: &str) -> String {
    format!("{} {}", method.to_ascii_uppercase(), path)
}

/// Immutable table of route and identity-class policies.
///
/// Building the table never touches the bucket registry.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    routes: HashMap<String, Policy>,
    classes: HashMap<String, Policy>,
    privileged_roles: Vec<String>,
}

impl PolicyTable {
    pub fn from_config(config: &LimiterConfig) -> Result<Self, PolicyError> {
        let mut routes = HashMap::with_capacity(config.routes.len());
        for (key, policy) in &config.routes {
            routes.insert(normalize_route_key(key), Policy::try_from(policy)?);
        }

        let mut classes = HashMap::with_capacity(config.classes.len());
        for (name, policy) in &config.classes {
            classes.insert(name.clone(), Policy::try_from(policy)?);
        }

        Ok(Self {
            routes,
            classes,
            privileged_roles: config.privileged_roles.clone(),
        })
    }

    pub fn with_route(mut self, method: &str, path: &str, policy: Policy) -> Self {
        self.routes.insert(route_descriptor(method, path), policy);
        self
    }

    pub fn with_class(mut self, class: &str, policy: Policy) -> Self {
        self.classes.insert(class.to_string(), policy);
        self
    }

    pub fn with_privileged_role(mut self, role: &str) -> Self {
        self.privileged_roles.push(role.to_string());
        self
    }

    /// Policy for an exact `"METHOD path"` descriptor. `None` means unmetered.
    pub fn resolve_route(&self, descriptor: &str) -> Option<&Policy> {
        self.routes.get(descriptor)
    }

    /// Class name an identity with `roles` falls into.
    pub fn identity_class(&self, roles: &[String]) -> &'static str {
        if roles.iter().any(|role| self.privileged_roles.contains(role)) {
            PRIVILEGED_CLASS
        } else {
            AUTHENTICATED_CLASS
        }
    }

    /// Policy for an identity with `roles`. `None` means unmetered.
    pub fn resolve_identity(&self, roles: &[String]) -> Option<&Policy> {
        self.classes.get(self.identity_class(roles))
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

/// Collapse whitespace and upper-case the method so `"post  /login"` and
/// `"POST /login"` resolve to the same entry.
fn normalize_route_key(key: &str) -> String {
    let mut parts = key.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(method), Some(path)) => route_descriptor(method, path),
        _ => key.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_policy_rejects_non_positive_values() {
        assert_eq!(Policy::new(0.0, 1.0), Err(PolicyError::NonPositiveRate(0.0)));
        assert_eq!(
            Policy::new(1.0, -2.0),
            Err(PolicyError::NonPositiveCapacity(-2.0))
        );
        assert!(Policy::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_per_minute_conversion() {
        let policy = Policy::per_minute(5.0, 1.0).unwrap();
        assert!((policy.rate_per_ms() - 1.0 / 60_000.0).abs() < 1e-15);
        assert_eq!(policy.capacity(), 5.0);
    }

    #[test]
    fn test_default_config_resolution() {
        let table = PolicyTable::from_config(&LimiterConfig::default()).unwrap();

        let login = table.resolve_route("POST /login").unwrap();
        assert_eq!(login.capacity(), 5.0);
        assert_eq!(table.resolve_route("POST /admin/login").unwrap().capacity(), 3.0);
        assert!(table.resolve_route("GET /students").is_none());

        let admin = table.resolve_identity(&roles(&["admin"])).unwrap();
        let student = table.resolve_identity(&roles(&["student"])).unwrap();
        assert!(admin.capacity() > student.capacity());
        assert!(admin.rate_per_ms() > student.rate_per_ms());
    }

    #[test]
    fn test_any_privileged_role_elevates() {
        let table = PolicyTable::default().with_privileged_role("admin");
        assert_eq!(table.identity_class(&roles(&["instructor", "admin"])), PRIVILEGED_CLASS);
        assert_eq!(table.identity_class(&roles(&["instructor"])), AUTHENTICATED_CLASS);
        assert_eq!(table.identity_class(&[]), AUTHENTICATED_CLASS);
    }

    #[test]
    fn test_missing_class_is_unmetered() {
        let table = PolicyTable::default();
        assert!(table.resolve_identity(&roles(&["student"])).is_none());
    }

    #[test]
    fn test_route_keys_are_normalized() {
        let mut config = LimiterConfig::default();
        config.routes.clear();
        config.routes.insert(
            "post   /students".to_string(),
            PolicyConfig {
                capacity: 2.0,
                refill_per_minute: 2.0,
            },
        );
        let table = PolicyTable::from_config(&config).unwrap();
        assert!(table.resolve_route(&route_descriptor("post", "/students")).is_some());
        assert_eq!(table.route_count(), 1);
    }
}
