//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_admissions_total` (counter): admission decisions by scope, outcome
//! - `gate_buckets` (gauge): live buckets per scope
//! - `gate_buckets_swept_total` (counter): buckets reclaimed per scope
//! - `gate_sessions_reaped_total` (counter): sessions deleted by the sweeper
//! - `gate_session_sweep_failures_total` (counter): store failures by stage

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape listener. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(scope: &'static str, outcome: &'static str) {
    counter!("gate_admissions_total", "scope" => scope, "outcome" => outcome).increment(1);
}

pub fn record_bucket_count(scope: &'static str, count: usize) {
    gauge!("gate_buckets", "scope" => scope).set(count as f64);
}

pub fn record_buckets_swept(scope: &'static str, removed: usize) {
    counter!("gate_buckets_swept_total", "scope" => scope).increment(removed as u64);
}

pub fn record_sessions_reaped(removed: usize) {
    counter!("gate_sessions_reaped_total").increment(removed as u64);
}

pub fn record_session_sweep_failure(stage: &'static str) {
    counter!("gate_session_sweep_failures_total", "stage" => stage).increment(1);
}
