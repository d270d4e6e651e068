//! Terminal responses produced by the pipeline itself.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub const QUOTA_EXCEEDED_BODY: &str = "Rate limit exceeded, please try again in a minute";

/// The request was rejected by an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaExceeded;

impl IntoResponse for QuotaExceeded {
    fn into_response(self) -> Response {
        (StatusCode::TOO_MANY_REQUESTS, QUOTA_EXCEEDED_BODY).into_response()
    }
}

/// The request carried a session id that is unknown, revoked or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthenticated;

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "You're not authenticated").into_response()
    }
}
