//! Prometheus metrics for grievance-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};

/// Complaint status updates by resulting status and outcome.
pub static STATUS_UPDATES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "grievance_status_updates_total",
        "Total number of complaint status updates",
        &["status", "outcome"]
    )
    .expect("Failed to register STATUS_UPDATES")
});

pub static ASSIGNMENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "grievance_assignments_total",
        "Total number of complaint assignments",
        &["outcome"]
    )
    .expect("Failed to register ASSIGNMENTS")
});

pub static ROLE_DECISIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "grievance_role_decisions_total",
        "Total number of role request decisions",
        &["decision"]
    )
    .expect("Failed to register ROLE_DECISIONS")
});

/// Per-complaint escalation sweep outcomes.
pub static SWEEP_OUTCOMES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "grievance_escalation_sweep_complaints_total",
        "Complaints examined by the escalation sweep, by outcome",
        &["outcome"]
    )
    .expect("Failed to register SWEEP_OUTCOMES")
});

pub static SWEEP_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "grievance_escalation_sweep_duration_seconds",
        "Escalation sweep duration in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register SWEEP_DURATION")
});

pub static NOTIFICATIONS_DISPATCHED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "grievance_notifications_dispatched_total",
        "Outbox events processed by the notification dispatcher",
        &["outcome"]
    )
    .expect("Failed to register NOTIFICATIONS_DISPATCHED")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&STATUS_UPDATES);
    Lazy::force(&ASSIGNMENTS);
    Lazy::force(&ROLE_DECISIONS);
    Lazy::force(&SWEEP_OUTCOMES);
    Lazy::force(&SWEEP_DURATION);
    Lazy::force(&NOTIFICATIONS_DISPATCHED);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_status_update(status: &str, outcome: &str) {
    STATUS_UPDATES.with_label_values(&[status, outcome]).inc();
}

pub fn record_assignment(outcome: &str) {
    ASSIGNMENTS.with_label_values(&[outcome]).inc();
}

pub fn record_role_decision(decision: &str) {
    ROLE_DECISIONS.with_label_values(&[decision]).inc();
}

pub fn record_sweep_outcome(outcome: &str, count: u64) {
    if count > 0 {
        SWEEP_OUTCOMES
            .with_label_values(&[outcome])
            .inc_by(count as f64);
    }
}

pub fn record_sweep_duration(duration_secs: f64) {
    SWEEP_DURATION.observe(duration_secs);
}

pub fn record_notification(outcome: &str) {
    NOTIFICATIONS_DISPATCHED.with_label_values(&[outcome]).inc();
}
