//! `GeoServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session::run_ws_session;

/// Body of `GET /`.
pub const SERVICE_NAME: &str = "Geo-DNS Router API";

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Open connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Monotonic start time, for uptime.
    pub start_time: Instant,
    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,
    /// Prometheus metrics handle.
    pub metrics_handle: PrometheusHandle,
}

/// The Geo-DNS router server.
pub struct GeoServer {
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    started_at: DateTime<Utc>,
    metrics_handle: PrometheusHandle,
}

impl GeoServer {
    /// Create a new server with an empty connection registry.
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.send_queue_capacity));
        Self {
            config: Arc::new(config),
            registry,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            started_at: Utc::now(),
            metrics_handle,
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            shutdown: self.shutdown.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
            started_at: self.started_at,
            metrics_handle: self.metrics_handle.clone(),
        };

        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve in a background task.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task,
    /// which ends after [`ShutdownCoordinator::shutdown`].
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let bind = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let shutdown = self.shutdown.cancelled_owned();

        info!(%addr, "geo-dns router listening");
        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(%error, "server exited with error");
            }
            info!("server stopped");
        });
        Ok((addr, handle))
    }

    /// The connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /
async fn root_handler() -> Json<Value> {
    Json(json!({ "message": SERVICE_NAME }))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.registry.connection_count().await;
    Json(health::health_check(
        state.start_time,
        state.started_at,
        connections,
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// GET /ws: upgrade and hand the socket to a session.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let active = state.registry.connection_count().await;
    if active >= state.config.max_connections {
        warn!(
            active,
            limit = state.config.max_connections,
            "connection limit reached, refusing upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let registry = state.registry.clone();
    let options = state.config.session_options();
    let cancel = state.shutdown.token();
    ws.max_message_size(state.config.max_message_size)
        .on_failed_upgrade(|error| warn!(%error, "websocket upgrade failed"))
        .on_upgrade(move |socket| run_ws_session(socket, registry, options, cancel))
}
