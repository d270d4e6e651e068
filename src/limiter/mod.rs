//! Admission-control subsystem.
//!
//! # Data Flow
//! ```text
//! Request (claims, method, matched path, client ip):
//!     → policy.rs   (resolve identity class / route policy, or unmetered)
//!     → registry.rs (single lock: lookup-or-create, refill, consume)
//!     → bucket.rs   (token math)
//!     → admit / reject
//!
//! Daily at local midnight:
//!     sweeper.rs → registry.rs (drop buckets idle past the retention window)
//! ```
//!
//! # Design Decisions
//! - Buckets are created lazily on the first admission check for a key
//! - One mutex covers both collections and the whole refill+consume step
//! - Bucket state is in-memory only; a restart starts every key full

pub mod bucket;
pub mod clock;
pub mod policy;
pub mod registry;
pub mod sweeper;

pub use bucket::Bucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use policy::{Policy, PolicyError, PolicyTable};
pub use registry::{BucketKey, BucketRegistry, RegistrySnapshot, SweepReport};
pub use sweeper::QuotaSweeper;
