//! Prometheus metrics for invoicing-engine.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Invoice number allocations by outcome.
pub static ALLOCATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_number_allocations_total",
        "Total number of invoice number allocations by outcome",
        &["outcome"] // sequential, fallback
    )
    .expect("Failed to register number_allocations_total")
});

/// Lifecycle transitions by action and result.
pub static TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_transitions_total",
        "Total number of lifecycle transitions by action and result",
        &["action", "result"] // result: applied, rejected
    )
    .expect("Failed to register transitions_total")
});

/// Invoices created, by number source.
pub static INVOICES_CREATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_invoices_created_total",
        "Total number of invoices created by number source",
        &["number_source"]
    )
    .expect("Failed to register invoices_created_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Counter store call duration histogram.
pub static STORE_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicing_counter_store_duration_seconds",
        "Counter store call duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register counter_store_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&ALLOCATIONS_TOTAL);
    Lazy::force(&TRANSITIONS_TOTAL);
    Lazy::force(&INVOICES_CREATED_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&STORE_CALL_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
