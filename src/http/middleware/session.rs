//! Session authentication middleware.
//! Turns a session id into request claims.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, Request,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::http::response::Unauthenticated;
use crate::http::server::GateState;

/// Identity attached to requests that carry a valid session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub roles: Vec<String>,
    pub session_id: String,
}

pub async fn session_middleware(
    State(state): State<GateState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let config = &state.config.sessions;

    // No session id: continue anonymously, the route limiter still applies.
    let Some(session_id) = session_id(request.headers(), config) else {
        return next.run(request).await;
    };

    let session = match state.sessions.get_session(&session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::debug!(session_id = %session_id, "Unknown session");
            return reject_stale_session(config, request, next).await;
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Session lookup failed");
            return Unauthenticated.into_response();
        }
    };

    let now = Utc::now();
    if !session.is_valid_at(now) {
        tracing::info!(
            session_id = %session_id,
            revoked = session.is_revoked,
            "Rejecting revoked or expired session"
        );
        if let Err(e) = state.sessions.delete_session(&session_id).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to delete invalid session");
        }
        return reject_stale_session(config, request, next).await;
    }

    if let Err(e) = state.sessions.touch_session(&session_id, now).await {
        tracing::warn!(session_id = %session_id, error = %e, "Failed to record session activity");
    }

    request.extensions_mut().insert(Claims {
        user_id: session.user_id,
        roles: session.roles,
        session_id,
    });
    next.run(request).await
}

/// The session is gone or no longer valid. Login paths continue anonymously,
/// everything else gets a 401. Either way the client's cookie is expired.
async fn reject_stale_session(
    config: &SessionConfig,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_login = config
        .login_paths
        .iter()
        .any(|path| path == request.uri().path());

    let mut response = if is_login {
        next.run(request).await
    } else {
        Unauthenticated.into_response()
    };

    match HeaderValue::from_str(&expired_session_cookie(config)) {
        Ok(cookie) => {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        Err(e) => tracing::warn!(error = %e, "Session cookie name is not a valid header value"),
    }
    response
}

/// `Set-Cookie` value that makes the client drop its session cookie.
pub fn expired_session_cookie(config: &SessionConfig) -> String {
    format!("{}=; Max-Age=0; Path=/; HttpOnly", config.cookie_name)
}

/// Session id from the configured header, else from the configured cookie.
pub fn session_id(headers: &HeaderMap, config: &SessionConfig) -> Option<String> {
    if let Some(value) = headers
        .get(config.header_name.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(value.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == config.cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
