//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → PolicyTable / sweepers built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; limiter policies never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, GateConfig, LimiterConfig, ListenerConfig, ObservabilityConfig, PolicyConfig,
    QuotaSweeperConfig, SessionConfig, SessionSweeperConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
