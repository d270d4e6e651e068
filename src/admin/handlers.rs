use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::http::server::GateState;
use crate::limiter::{QuotaSweeper, RegistrySnapshot, SweepReport};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct LimiterStatus {
    pub buckets: RegistrySnapshot,
    pub metered_routes: usize,
}

#[derive(Serialize)]
pub struct SessionStatus {
    pub sessions: usize,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_limiter(State(state): State<GateState>) -> Json<LimiterStatus> {
    Json(LimiterStatus {
        buckets: state.registry.snapshot(),
        metered_routes: state.policies.route_count(),
    })
}

/// Run a quota sweep now, with the configured retention measured from now.
pub async fn post_sweep(State(state): State<GateState>) -> Json<SweepReport> {
    let sweeper = QuotaSweeper::new(
        state.registry.clone(),
        Duration::from_secs(state.config.quota_sweeper.retention_secs),
    );
    Json(sweeper.sweep_at(state.registry.now_millis()))
}

pub async fn get_sessions(
    State(state): State<GateState>,
) -> Result<Json<SessionStatus>, (StatusCode, String)> {
    match state.sessions.list_sessions().await {
        Ok(sessions) => Ok(Json(SessionStatus {
            sessions: sessions.len(),
        })),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list sessions");
            Err((StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}
