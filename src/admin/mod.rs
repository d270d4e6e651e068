//! Operator endpoints for inspecting the limiter and session store.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::GateState;

pub fn setup_admin_router(state: GateState) -> Router<GateState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/limiter", get(get_limiter))
        .route("/admin/limiter/sweep", post(post_sweep))
        .route("/admin/sessions", get(get_sessions))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
