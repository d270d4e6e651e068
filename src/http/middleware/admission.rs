//! Admission middleware with identity-scoped and route-scoped token buckets.

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::middleware::session::Claims;
use crate::http::response::QuotaExceeded;
use crate::http::server::GateState;
use crate::limiter::policy::route_descriptor;
use crate::limiter::BucketKey;
use crate::observability::metrics;

/// Meter authenticated identities by role class. Anonymous requests pass.
pub async fn identity_admission_middleware(
    State(state): State<GateState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(claims) = request.extensions().get::<Claims>() else {
        return next.run(request).await;
    };

    let user_id = claims.user_id;
    let class = state.policies.identity_class(&claims.roles);
    let policy = state.policies.resolve_identity(&claims.roles);
    if policy.is_none() {
        tracing::debug!(user_id = %user_id, class, "No policy for identity class, unmetered");
    }

    let key = BucketKey::Identity(user_id);
    if state.registry.admit(&key, policy) {
        metrics::record_admission(key.scope(), "admitted");
        next.run(request).await
    } else {
        tracing::warn!(user_id = %user_id, class, "Rate limit exceeded");
        metrics::record_admission(key.scope(), "rejected");
        QuotaExceeded.into_response()
    }
}

/// Meter `(client address, route)` pairs for routes in the policy table.
pub async fn route_admission_middleware(
    State(state): State<GateState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let descriptor = route_descriptor(request.method().as_str(), &path);

    let Some(policy) = state.policies.resolve_route(&descriptor) else {
        tracing::trace!(route = %descriptor, "Route unmetered");
        return next.run(request).await;
    };

    let trust_headers = state.config.listener.trust_proxy_headers;
    let Some(ip) = client_ip(&request, trust_headers) else {
        tracing::error!(route = %descriptor, "Cannot determine client address");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    };

    let key = BucketKey::route(&ip.to_string(), &descriptor);
    if state.registry.admit(&key, Some(policy)) {
        metrics::record_admission(key.scope(), "admitted");
        next.run(request).await
    } else {
        tracing::warn!(client = %ip, route = %descriptor, "Rate limit exceeded");
        metrics::record_admission(key.scope(), "rejected");
        QuotaExceeded.into_response()
    }
}

/// Client address for route keys. Forwarding headers are only consulted when
/// the gate sits behind a trusted proxy.
pub fn client_ip(request: &Request<Body>, trust_proxy_headers: bool) -> Option<IpAddr> {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(request.headers()) {
            return Some(ip);
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("x-real-ip")
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse().ok())
        })
}
