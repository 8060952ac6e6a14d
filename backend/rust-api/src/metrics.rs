use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::BackendError;

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Data store metrics (Supabase PostgREST)
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "store_operations_total",
        "Total number of data store operations",
        &["operation", "table", "status"]
    )
    .unwrap();

    pub static ref STORE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "store_operation_duration_seconds",
        "Data store operation duration in seconds",
        &["operation", "table"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // Identity provider metrics (Supabase GoTrue)
    pub static ref IDENTITY_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "identity_operations_total",
        "Total number of identity provider calls",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref WINDOW_CACHE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "competition_window_cache_total",
        "Competition window cache lookups",
        &["result"]
    )
    .unwrap();

    // Business Metrics
    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_submitted_total",
        "Total number of answers stored",
        &["correctness"]
    )
    .unwrap();

    pub static ref SUBMISSIONS_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_rejected_total",
        "Submissions refused by the session gate",
        &["reason"]
    )
    .unwrap();

    pub static ref COUNTDOWN_STREAMS_ACTIVE: IntGauge = register_int_gauge!(
        "countdown_streams_active",
        "Number of open countdown SSE streams"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track data store operation with metrics
pub async fn track_store_operation<F, T>(
    operation: &str,
    table: &str,
    future: F,
) -> Result<T, BackendError>
where
    F: std::future::Future<Output = Result<T, BackendError>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = match &result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    };

    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, table, status])
        .inc();

    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(duration);

    result
}

pub fn record_identity_call<T>(operation: &str, result: &Result<T, BackendError>) {
    let status = match result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    };
    IDENTITY_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

pub fn record_window_cache_hit() {
    WINDOW_CACHE_TOTAL.with_label_values(&["hit"]).inc();
}

pub fn record_window_cache_miss() {
    WINDOW_CACHE_TOTAL.with_label_values(&["miss"]).inc();
}
