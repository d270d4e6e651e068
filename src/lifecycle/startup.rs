//! Startup orchestration for the background reclaimers.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::GateConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::limiter::{BucketRegistry, QuotaSweeper};
use crate::sessions::{SessionStore, SessionSweeper};

/// Fatal errors while bringing the gate up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no Tokio runtime available to schedule background tasks")]
    NoRuntime,

    #[error("invalid limiter policy: {0}")]
    Policy(#[from] crate::limiter::PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawn the quota sweeper and the session sweeper (each when enabled).
pub fn spawn_sweepers(
    config: &GateConfig,
    registry: Arc<BucketRegistry>,
    store: Arc<dyn SessionStore>,
    shutdown: &Shutdown,
) -> Result<Vec<JoinHandle<()>>, StartupError> {
    let runtime = Handle::try_current().map_err(|_| StartupError::NoRuntime)?;
    let mut handles = Vec::new();

    if config.quota_sweeper.enabled {
        let sweeper = QuotaSweeper::new(
            registry,
            Duration::from_secs(config.quota_sweeper.retention_secs),
        );
        handles.push(runtime.spawn(sweeper.run(shutdown.subscribe())));
    } else {
        tracing::info!("Quota sweeper disabled");
    }

    if config.session_sweeper.enabled {
        let sweeper = SessionSweeper::new(
            store,
            Duration::from_secs(config.session_sweeper.interval_secs),
            Duration::from_secs(config.session_sweeper.retention_secs),
        );
        handles.push(runtime.spawn(sweeper.run(shutdown.subscribe())));
    } else {
        tracing::info!("Session sweeper disabled");
    }

    Ok(handles)
}
