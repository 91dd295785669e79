//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Quote serving and cache effectiveness
//! - Swap pipeline outcomes and latency
//! - Job monitoring activity
//! - Foreign-deposit verification polling

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // Quote metrics
    pub static ref QUOTES_SERVED: IntCounterVec = register_int_counter_vec!(
        "swapbridge_quotes_served_total",
        "Total quotes served by source",
        &["source"]
    ).unwrap();

    // Swap pipeline metrics
    pub static ref SWAPS_INITIATED: IntCounter = register_int_counter!(
        "swapbridge_swaps_initiated_total",
        "Total swaps that passed all gates and began executing"
    ).unwrap();

    pub static ref SWAPS_COMPLETED: IntCounter = register_int_counter!(
        "swapbridge_swaps_completed_total",
        "Total swaps completed successfully"
    ).unwrap();

    pub static ref SWAPS_FAILED: IntCounter = register_int_counter!(
        "swapbridge_swaps_failed_total",
        "Total swaps that failed after retries"
    ).unwrap();

    pub static ref SWAP_LATENCY: Histogram = register_histogram!(
        "swapbridge_swap_latency_seconds",
        "End-to-end swap execution latency",
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();

    // Job monitoring metrics
    pub static ref JOBS_ACTIVE: IntGauge = register_int_gauge!(
        "swapbridge_jobs_active",
        "Cross-ledger jobs currently being monitored"
    ).unwrap();

    pub static ref JOB_POLLS: IntCounter = register_int_counter!(
        "swapbridge_job_polls_total",
        "Total job status polls"
    ).unwrap();

    pub static ref JOB_POLL_ERRORS: IntCounter = register_int_counter!(
        "swapbridge_job_poll_errors_total",
        "Job status polls that failed"
    ).unwrap();

    // Foreign-deposit verification metrics
    pub static ref VERIFY_POLLS: IntCounter = register_int_counter!(
        "swapbridge_verify_polls_total",
        "Total foreign-transaction lookup polls"
    ).unwrap();

    pub static ref VERIFY_TIMEOUTS: IntCounter = register_int_counter!(
        "swapbridge_verify_timeouts_total",
        "Verification attempts that exhausted their poll budget"
    ).unwrap();
}

// Helper functions to record metrics

pub fn record_quote_served(cache_hit: bool) {
    let source = if cache_hit { "cache" } else { "fresh" };
    QUOTES_SERVED.with_label_values(&[source]).inc();
}

pub fn record_swap_initiated() {
    SWAPS_INITIATED.inc();
}

pub fn record_swap_completed(latency_secs: f64) {
    SWAPS_COMPLETED.inc();
    SWAP_LATENCY.observe(latency_secs);
}

pub fn record_swap_failed() {
    SWAPS_FAILED.inc();
}

pub fn inc_jobs_active() {
    JOBS_ACTIVE.inc();
}

pub fn dec_jobs_active() {
    JOBS_ACTIVE.dec();
}

pub fn record_job_poll() {
    JOB_POLLS.inc();
}

pub fn record_job_poll_error() {
    JOB_POLL_ERRORS.inc();
}

pub fn record_verify_poll() {
    VERIFY_POLLS.inc();
}

pub fn record_verify_timeout() {
    VERIFY_TIMEOUTS.inc();
}

/// Render all registered metrics in the text exposition format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
