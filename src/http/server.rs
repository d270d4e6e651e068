//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gate's own handlers and any app routes
//! - Wire up middleware (session, admission, request ID, tracing, timeout)
//! - Spawn the background sweepers
//! - Serve until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::GateConfig;
use crate::http::middleware::{
    expired_session_cookie, identity_admission_middleware, route_admission_middleware,
    session_middleware, Claims,
};
use crate::lifecycle::{spawn_sweepers, Shutdown, StartupError};
use crate::limiter::{BucketRegistry, PolicyTable};
use crate::sessions::SessionStore;

/// Application state injected into middleware and handlers.
#[derive(Clone)]
pub struct GateState {
    pub config: Arc<GateConfig>,
    pub policies: Arc<PolicyTable>,
    pub registry: Arc<BucketRegistry>,
    pub sessions: Arc<dyn SessionStore>,
}

impl GateState {
    pub fn new(config: GateConfig, sessions: Arc<dyn SessionStore>) -> Result<Self, StartupError> {
        Self::with_registry(config, sessions, Arc::new(BucketRegistry::new()))
    }

    pub fn with_registry(
        config: GateConfig,
        sessions: Arc<dyn SessionStore>,
        registry: Arc<BucketRegistry>,
    ) -> Result<Self, StartupError> {
        let policies = PolicyTable::from_config(&config.limiter)?;
        tracing::info!(
            metered_routes = policies.route_count(),
            "Limiter policies loaded"
        );

        Ok(Self {
            config: Arc::new(config),
            policies: Arc::new(policies),
            registry,
            sessions,
        })
    }
}

/// HTTP server for the admission gate.
pub struct GateServer {
    router: Router,
    state: GateState,
}

impl GateServer {
    /// Build a server exposing only the gate's own routes.
    pub fn new(state: GateState) -> Self {
        Self::with_routes(state, Router::new())
    }

    /// Build a server that puts `routes` behind the admission pipeline.
    pub fn with_routes(state: GateState, routes: Router<GateState>) -> Self {
        let router = Self::build_router(state.clone(), routes);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Route layers run outermost-last: session, then identity admission,
    /// then route admission.
    #[allow(deprecated)]
    fn build_router(state: GateState, routes: Router<GateState>) -> Router {
        let mut router = Router::new()
            .route("/health", get(health))
            .route("/whoami", get(whoami))
            .route("/logout", post(logout))
            .merge(routes);

        if state.config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                route_admission_middleware,
            ))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                identity_admission_middleware,
            ))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                session_middleware,
            ))
            .with_state(state.clone())
            .layer(TimeoutLayer::new(Duration::from_secs(
                state.config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Spawn the sweepers and serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), StartupError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweepers = spawn_sweepers(
            &self.state.config,
            self.state.registry.clone(),
            self.state.sessions.clone(),
            &shutdown,
        )?;

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        for handle in sweepers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Sweeper task failed");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn whoami(request: Request<Body>) -> Response {
    match request.extensions().get::<Claims>() {
        Some(claims) => Json(claims.clone()).into_response(),
        None => Json(json!({ "anonymous": true })).into_response(),
    }
}

/// Delete the caller's session and expire the cookie.
async fn logout(State(state): State<GateState>, request: Request<Body>) -> Response {
    let session_id = request
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.session_id.clone());

    if let Some(session_id) = session_id {
        if let Err(e) = state.sessions.delete_session(&session_id).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to delete session on logout");
        }
    }

    let expired_cookie = expired_session_cookie(&state.config.sessions);
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_cookie)],
    )
        .into_response()
}
