//! Periodic reclamation of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::sessions::store::SessionStore;

/// Outcome of one sweep tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Background task deleting sessions idle longer than the retention window.
pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    interval: Duration,
    retention: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>, interval: Duration, retention: Duration) -> Self {
        Self {
            store,
            interval,
            retention,
        }
    }

    /// Run until `shutdown` fires. The first sweep happens one full interval
    /// after start.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            retention_secs = self.retention.as_secs(),
            "Session sweeper running"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once(Utc::now()).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Delete every session whose last activity is strictly before
    /// `now - retention`. Store failures are logged and never abort the sweep.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SessionSweepReport {
        let mut report = SessionSweepReport::default();

        let Some(cutoff) = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
        else {
            tracing::warn!(retention_secs = self.retention.as_secs(), "Session retention out of range, skipping sweep");
            return report;
        };

        tracing::info!(cutoff = %cutoff, "Session sweeper checkpoint");

        let sessions = match self.store.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list sessions");
                metrics::record_session_sweep_failure("list");
                return report;
            }
        };

        for session in sessions {
            report.scanned += 1;
            if session.last_activity >= cutoff {
                continue;
            }

            match self.store.delete_session(&session.id).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::record_session_sweep_failure("delete");
                    tracing::warn!(session_id = %session.id, error = %e, "Failed to delete stale session");
                }
            }
        }

        metrics::record_sessions_reaped(report.removed);
        tracing::info!(
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            "Stale sessions reclaimed"
        );
        report
    }
}
