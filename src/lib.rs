//! Admission control and background reclamation for a student-records web
//! service.
//!
//! The request pipeline runs every inbound request through a session check,
//! an identity-scoped token bucket and a route-scoped token bucket before it
//! reaches business handlers. Two long-lived tasks reclaim state that is no
//! longer in use: the quota sweeper (daily, in-process buckets) and the
//! session sweeper (periodic, persisted sessions).

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod limiter;
pub mod observability;
pub mod sessions;

pub use config::schema::GateConfig;
pub use http::GateServer;
pub use lifecycle::Shutdown;
pub use limiter::{BucketRegistry, Policy, PolicyTable};
pub use sessions::{MemorySessionStore, SessionStore};
