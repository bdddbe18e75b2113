//! # Webhook Server
//!
//! The `axum` server receiving Alertmanager webhooks, answering liveness and
//! readiness checks, and, when enabled, exposing Prometheus metrics.
//!
//! The server shuts down gracefully when the shutdown signal fires: it stops
//! accepting connections and lets in-flight requests finish.

use crate::core::{AlertmanagerPayload, Publisher};
use crate::ingest::AlertIntake;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub intake: AlertIntake,
    pub publisher: Arc<dyn Publisher>,
    pub check_timeout: Duration,
}

/// Builds the router with every route the service exposes.
pub fn router(state: AppState, prom_handle: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        // Alertmanager batches can be large; any readable body is accepted.
        .route("/alert", post(alert_handler).layer(DefaultBodyLimit::disable()))
        .route("/healthz", get(|| async { "ok" }))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    if let Some(handle) = prom_handle {
        app = app.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }
    app
}

async fn alert_handler(State(state): State<AppState>, body: Bytes) -> (StatusCode, &'static str) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        debug!(body = %String::from_utf8_lossy(&body), "Received alert");
    }

    // A bare `null` body is an empty payload.
    let payload = match serde_json::from_slice::<Option<AlertmanagerPayload>>(&body) {
        Ok(payload) => payload.unwrap_or_default(),
        Err(e) => {
            error!(error = %e, "Error parsing request");
            return (StatusCode::BAD_REQUEST, "Failed to parse request body");
        }
    };

    for alert in payload.alerts {
        if let Err(e) = state.intake.submit(alert).await {
            warn!(error = %e, "Dropping alert");
        }
    }

    (StatusCode::OK, "Alerts received")
}

async fn ready_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if check_publisher(&state).await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
    }
}

async fn status_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if check_publisher(&state).await {
        debug!("Successfully connected to the publisher during health check");
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
    }
}

/// Runs the publisher's connection check, bounded by the API call timeout.
async fn check_publisher(state: &AppState) -> bool {
    match tokio::time::timeout(state.check_timeout, state.publisher.check_connection()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(error = %e, "Publisher connection check failed");
            false
        }
        Err(_) => {
            error!(timeout = ?state.check_timeout, "Publisher connection check timed out");
            false
        }
    }
}

/// The webhook server, bound but not yet serving.
pub struct WebhookServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl WebhookServer {
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `router` - The routes to serve.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(listener: TcpListener, router: Router, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            router,
            shutdown_rx,
        }
    }

    /// Returns a future that serves requests until the shutdown signal fires
    /// and every in-flight request has completed.
    pub async fn run(self) {
        let mut shutdown_rx = self.shutdown_rx;
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "Server started");
        }

        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
                trace!("Webhook server received shutdown signal.");
            })
            .await;

        if let Err(e) = result {
            error!("Webhook server error: {}", e);
        }
        trace!("Webhook server task finished.");
    }
}
