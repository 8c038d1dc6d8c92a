use metrics::{describe_counter, describe_histogram, histogram, increment_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use tracing::warn;

pub const CACHE_HITS: &str = "screenshot_cache_hits_total";
pub const CACHE_MISSES: &str = "screenshot_cache_misses_total";
pub const CAPTURES: &str = "screenshot_captures_total";
pub const CAPTURE_FAILURES: &str = "screenshot_capture_failures_total";
pub const STALE_SERVED: &str = "screenshot_stale_served_total";
pub const CAPTURE_DURATION: &str = "screenshot_capture_duration_seconds";

/// Install the Prometheus recorder backing the `/metrics` endpoint.
///
/// A failure here (e.g. a recorder already installed in tests) degrades to
/// no-op metrics rather than aborting startup.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(error = %err, "failed to install metrics recorder, metrics disabled");
            None
        }
    }
}

pub fn describe() {
    describe_counter!(CACHE_HITS, "Requests served from a fresh cached artifact");
    describe_counter!(CACHE_MISSES, "Requests that required a capture or stale fallback");
    describe_counter!(CAPTURES, "Successful browser captures");
    describe_counter!(CAPTURE_FAILURES, "Failed browser captures");
    describe_counter!(STALE_SERVED, "Stale artifacts served after a failed capture");
    describe_histogram!(CAPTURE_DURATION, "Wall-clock duration of browser captures");
}

pub fn record_cache_hit() {
    increment_counter!(CACHE_HITS);
}

pub fn record_cache_miss() {
    increment_counter!(CACHE_MISSES);
}

pub fn record_capture(duration: Duration, success: bool) {
    if success {
        increment_counter!(CAPTURES);
    } else {
        increment_counter!(CAPTURE_FAILURES);
    }
    histogram!(CAPTURE_DURATION, duration.as_secs_f64());
}

pub fn record_stale_served() {
    increment_counter!(STALE_SERVED);
}
