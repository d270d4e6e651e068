//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use admission_gate::config::GateConfig;
use admission_gate::http::{GateServer, GateState};
use admission_gate::lifecycle::Shutdown;
use admission_gate::sessions::{SessionRecord, SessionStore};
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A gate serving on an ephemeral local port.
pub struct RunningGate {
    pub addr: SocketAddr,
    pub state: GateState,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

impl RunningGate {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("gate did not shut down")
            .expect("gate task panicked");
    }
}

/// Start a gate with `routes` mounted behind the admission pipeline.
pub async fn start_gate(
    config: GateConfig,
    store: Arc<dyn SessionStore>,
    routes: Router<GateState>,
) -> RunningGate {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = GateState::new(config, store).unwrap();
    let server = GateServer::with_routes(state.clone(), routes);
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();

    let handle = tokio::spawn(async move {
        server.run(listener, server_shutdown).await.unwrap();
    });

    RunningGate {
        addr,
        state,
        shutdown,
        handle,
    }
}

/// A config with both sweepers off so tests control reclamation.
#[allow(dead_code)]
pub fn quiet_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.quota_sweeper.enabled = false;
    config.session_sweeper.enabled = false;
    config
}

#[allow(dead_code)]
pub fn session(id: &str, roles: &[&str], last_activity: DateTime<Utc>) -> SessionRecord {
    SessionRecord {
        id: id.to_string(),
        user_id: Uuid::new_v4(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        last_activity,
        expire_at: last_activity + chrono::Duration::days(1),
        is_revoked: false,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
