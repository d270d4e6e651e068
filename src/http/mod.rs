//! HTTP request pipeline.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace, timeout)
//!     → middleware/session.rs (resolve session → Claims)
//!     → middleware/admission.rs (identity bucket, then route bucket)
//!     → handlers
//!     → response.rs (429 on quota exceeded)
//! ```

pub mod middleware;
pub mod response;
pub mod server;

pub use middleware::session::Claims;
pub use response::QuotaExceeded;
pub use server::{GateServer, GateState};
