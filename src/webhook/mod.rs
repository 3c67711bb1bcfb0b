//! Webhook HTTP server
//!
//! The secret manager POSTs event batches to `/webhook`. Each accepted batch
//! triggers a reload pass for the first event's item; the handler answers
//! only after that pass (including any cache-buster wait) has finished.
//!
//! Routes:
//! - POST /webhook - basic-auth protected event intake
//! - GET /healthz - unauthenticated liveness probe

pub mod auth;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::WebhookCredentials;
use crate::event::decode_events;
use crate::reloader::Reloader;
use crate::Error;

/// Shared state for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    /// Reload pipeline run for each accepted event
    pub reloader: Arc<Reloader>,
}

impl WebhookState {
    /// Create a new webhook state around `reloader`
    pub fn new(reloader: Reloader) -> Self {
        Self {
            reloader: Arc::new(reloader),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Decode(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to reload ExternalSecrets".to_string(),
            ),
        };

        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

/// Build the webhook router.
///
/// `/webhook` sits behind basic authentication with `credentials`;
/// `/healthz` is open so kubelet probes need no secret.
pub fn webhook_router(state: WebhookState, credentials: WebhookCredentials) -> Router {
    let protected = Router::new()
        .route("/webhook", post(webhook_handler))
        .route_layer(middleware::from_fn_with_state(
            Arc::new(credentials),
            auth::require_basic_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(protected)
        .route("/healthz", get(|| async { "ok" }))
}

/// Handle one event batch.
///
/// The body is decoded as JSON whatever its Content-Type. Only the first
/// event is acted on; later events in the batch are logged and dropped.
async fn webhook_handler(
    State(state): State<WebhookState>,
    body: Bytes,
) -> Result<StatusCode, Error> {
    let events = decode_events(&body).inspect_err(|e| {
        warn!(error = %e, bytes = body.len(), "Rejected malformed event batch");
    })?;
    debug!(count = events.len(), events = ?events, "Received event batch");

    let Some(event) = events.first() else {
        info!("Event batch is empty, nothing to reload");
        return Ok(StatusCode::OK);
    };
    if events.len() > 1 {
        warn!(
            count = events.len(),
            "Only the first event of a batch is processed"
        );
    }

    let Some(item_name) = event.item_name() else {
        warn!(
            event_id = ?event.event_id,
            event_type = ?event.event_type,
            "Event has no item_name, ignoring"
        );
        return Ok(StatusCode::OK);
    };

    info!(item = %item_name, event_type = ?event.event_type, "Received secret update event");
    state.reloader.reload(item_name).await.inspect_err(|e| {
        error!(item = %item_name, error = %e, "Reload failed");
    })?;

    Ok(StatusCode::OK)
}

/// Bind `addr` and serve `router` until SIGINT or SIGTERM.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn start_webhook_server(addr: SocketAddr, router: Router) -> Result<(), Error> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::internal(format!("failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "Webhook server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::internal(format!("webhook server error: {e}")))?;

    info!("Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
