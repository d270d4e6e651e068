//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build policy table → Spawn sweepers → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → latched watch → sweepers exit loops → server drains
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Failing to schedule background tasks is reported once, at startup
//! - Sweepers never hold the registry lock while waiting on shutdown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{spawn_sweepers, StartupError};
