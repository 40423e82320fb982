//! Prometheus metrics recorder and metric names.

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Fails if another recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Register help text for every metric this crate records.
pub fn describe_metrics() {
    describe_counter!(WS_CONNECTIONS_TOTAL, "WebSocket connections accepted");
    describe_counter!(WS_DISCONNECTIONS_TOTAL, "WebSocket sessions ended, by reason");
    describe_gauge!(WS_CONNECTIONS_ACTIVE, "Currently open WebSocket connections");
    describe_histogram!(
        WS_CONNECTION_DURATION_SECONDS,
        Unit::Seconds,
        "Lifetime of WebSocket sessions"
    );
    describe_counter!(
        WS_BROADCAST_DROPS_TOTAL,
        "Broadcast messages not enqueued for a recipient"
    );
    describe_counter!(ROUTING_DECISIONS_TOTAL, "Routing decisions computed");
    describe_histogram!(ROUTING_DISTANCE_KM, "Distance from user to selected node in km");
    describe_counter!(MESSAGES_IGNORED_TOTAL, "Inbound messages ignored, by reason");
    describe_counter!(MESSAGES_REJECTED_TOTAL, "Inbound messages that failed to decode");
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter, labels: reason).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket session duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Broadcast drops total (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Routing decisions total (counter).
pub const ROUTING_DECISIONS_TOTAL: &str = "routing_decisions_total";
/// Selected node distance in km (histogram).
pub const ROUTING_DISTANCE_KM: &str = "routing_distance_km";
/// Ignored inbound messages (counter, labels: reason).
pub const MESSAGES_IGNORED_TOTAL: &str = "messages_ignored_total";
/// Undecodable inbound messages (counter).
pub const MESSAGES_REJECTED_TOTAL: &str = "messages_rejected_total";
