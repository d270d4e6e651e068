//! Request middleware, applied as route layers so the matched route pattern
//! is visible.

pub mod admission;
pub mod session;

pub use admission::{client_ip, identity_admission_middleware, route_admission_middleware};
pub use session::{expired_session_cookie, session_middleware, Claims};
