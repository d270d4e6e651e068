//! Persisted authentication sessions.
//!
//! # Data Flow
//! ```text
//! Login (external)        → store.rs insert_session
//! Authenticated request   → http/middleware/session.rs get + touch
//! Logout                  → store.rs delete_session
//! Every interval          → sweeper.rs list + delete idle sessions
//! ```
//!
//! # Design Decisions
//! - Timestamps are `DateTime<Utc>` at write and read time, no offsets
//! - Deletes are idempotent so the sweeper may race a logout freely
//! - The sweeper relies on the store's own consistency, never on the
//!   bucket registry lock

pub mod store;
pub mod sweeper;

pub use store::{MemorySessionStore, SessionRecord, SessionStore, SessionStoreError};
pub use sweeper::{SessionSweepReport, SessionSweeper};
