//! Prometheus metrics for pipeline runs.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const INFERENCE_CALLS_TOTAL: &str = "vshorts_inference_calls_total";
    pub const INFERENCE_DURATION_SECONDS: &str = "vshorts_inference_duration_seconds";
    pub const PARSER_IGNORED_LINES_TOTAL: &str = "vshorts_parser_ignored_lines_total";
    pub const TIMECODES_EXTRACTED_TOTAL: &str = "vshorts_timecodes_extracted_total";
    pub const TIMECODES_FILTERED_TOTAL: &str = "vshorts_timecodes_filtered_total";
    pub const STAGE_DURATION_SECONDS: &str = "vshorts_stage_duration_seconds";
    pub const CLIPS_RENDERED_TOTAL: &str = "vshorts_clips_rendered_total";
    pub const RUNS_TOTAL: &str = "vshorts_runs_total";
}

/// Record one inference call; `outcome` is `ok` or an error kind.
pub fn record_inference_call(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::INFERENCE_CALLS_TOTAL, &labels).increment(1);
    histogram!(names::INFERENCE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_ignored_lines(count: usize) {
    counter!(names::PARSER_IGNORED_LINES_TOTAL).increment(count as u64);
}

pub fn record_timecodes_extracted(count: usize) {
    counter!(names::TIMECODES_EXTRACTED_TOTAL).increment(count as u64);
}

pub fn record_timecodes_filtered(count: usize) {
    counter!(names::TIMECODES_FILTERED_TOTAL).increment(count as u64);
}

pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a rendered clip; `kind` is `short` or `preview`.
pub fn record_clip_rendered(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::CLIPS_RENDERED_TOTAL, &labels).increment(1);
}

/// Record a finished run; `state` is the terminal pipeline state.
pub fn record_run(state: &str) {
    let labels = [("state", state.to_string())];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
}
