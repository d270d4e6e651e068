//! Daily reclamation of idle buckets.
//!
//! # Responsibilities
//! - Sleep until the next local midnight without holding the registry lock
//! - Drop buckets not refilled within the retention window before that instant
//! - Recompute the next midnight after every sweep

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone};

use crate::lifecycle::ShutdownSignal;
use crate::limiter::clock::{Clock, SystemClock};
use crate::limiter::registry::{BucketRegistry, SweepReport};
use crate::observability::metrics;

/// Background task reclaiming buckets once per calendar day.
pub struct QuotaSweeper {
    registry: Arc<BucketRegistry>,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl QuotaSweeper {
    pub fn new(registry: Arc<BucketRegistry>, retention: Duration) -> Self {
        Self::with_clock(registry, retention, Arc::new(SystemClock))
    }

    pub fn with_clock(
        registry: Arc<BucketRegistry>,
        retention: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            retention,
            clock,
        }
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            retention_secs = self.retention.as_secs(),
            "Quota sweeper running"
        );

        loop {
            let now_millis = self.clock.now_millis();
            let Some(now) = Local.timestamp_millis_opt(now_millis).single() else {
                tracing::error!(now_millis, "Clock reading out of range, quota sweeper stopping");
                break;
            };
            let scheduled = next_midnight(&now);
            let wait = scheduled
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            tracing::debug!(next_sweep = %scheduled, "Quota sweeper sleeping");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.sweep_at(scheduled.timestamp_millis());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Quota sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Sweep relative to the instant the sweep was scheduled for (ms since
    /// epoch), not relative to when it actually runs.
    pub fn sweep_at(&self, scheduled_millis: i64) -> SweepReport {
        let retention_ms = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = scheduled_millis.saturating_sub(retention_ms);

        tracing::info!(cutoff, "Quota sweeper checkpoint");
        let report = self.registry.sweep(cutoff);
        let remaining = self.registry.snapshot();

        metrics::record_buckets_swept("identity", report.identities_removed);
        metrics::record_buckets_swept("route", report.routes_removed);
        metrics::record_bucket_count("identity", remaining.identities);
        metrics::record_bucket_count("route", remaining.routes);

        tracing::info!(
            identities_removed = report.identities_removed,
            routes_removed = report.routes_removed,
            identities_remaining = remaining.identities,
            routes_remaining = remaining.routes,
            "Stale buckets reclaimed"
        );
        report
    }
}

/// First local midnight strictly after `now`.
///
/// When midnight does not exist (a DST jump at 00:00) the first valid instant
/// of that day is used; when it occurs twice the earlier one wins.
pub fn next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);
    let midnight = tomorrow.and_time(NaiveTime::MIN);

    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| now.clone() + chrono::Duration::days(1))
}
