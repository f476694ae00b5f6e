//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connections
//! - Users currently marked online
//! - Real-time events emitted, by event name
//! - Messages broadcast but not persisted

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

const NAMESPACE: &str = "chatline";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Open WebSocket connections
pub static SOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("socket_connections_active", "Number of open WebSocket connections")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create SOCKET_CONNECTIONS_ACTIVE metric")
});

/// Size of the presence set
pub static ONLINE_USERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("online_users", "Number of users marked online").namespace(NAMESPACE),
    )
    .expect("Failed to create ONLINE_USERS metric")
});

/// Emitted events - one increment per publish call, not per recipient
pub static EVENTS_EMITTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_emitted_total", "Real-time events emitted").namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create EVENTS_EMITTED_TOTAL metric")
});

/// Messages delivered live whose insert failed afterwards
pub static MESSAGE_PERSIST_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "message_persist_failures_total",
            "Broadcast messages that failed to persist",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create MESSAGE_PERSIST_FAILURES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(SOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register SOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(ONLINE_USERS.clone()))
        .expect("Failed to register ONLINE_USERS");
    registry
        .register(Box::new(EVENTS_EMITTED_TOTAL.clone()))
        .expect("Failed to register EVENTS_EMITTED_TOTAL");
    registry
        .register(Box::new(MESSAGE_PERSIST_FAILURES_TOTAL.clone()))
        .expect("Failed to register MESSAGE_PERSIST_FAILURES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

pub fn socket_opened() {
    SOCKET_CONNECTIONS_ACTIVE.inc();
}

pub fn socket_closed() {
    SOCKET_CONNECTIONS_ACTIVE.dec();
}

pub fn set_online_users(count: usize) {
    ONLINE_USERS.set(count as i64);
}

pub fn record_event(event: &str) {
    EVENTS_EMITTED_TOTAL.with_label_values(&[event]).inc();
}

pub fn record_persist_failure() {
    MESSAGE_PERSIST_FAILURES_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = &*REGISTRY;
        let _ = &*SOCKET_CONNECTIONS_ACTIVE;
        let _ = &*EVENTS_EMITTED_TOTAL;
    }

    #[test]
    fn test_gather_metrics_contains_all_families() {
        record_event("alert");
        record_persist_failure();
        set_online_users(3);
        socket_opened();
        socket_closed();

        let metrics = gather_metrics().unwrap();
        assert!(metrics.contains("chatline_events_emitted_total"));
        assert!(metrics.contains("event=\"alert\""));
        assert!(metrics.contains("chatline_message_persist_failures_total"));
        assert!(metrics.contains("chatline_online_users"));
        assert!(metrics.contains("chatline_socket_connections_active"));
    }
}
