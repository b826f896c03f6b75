//! API Server (Cold Path)
//!
//! HTTP/WebSocket bridge onto the event bus. Every request is forwarded to
//! the router through the bus; the server never touches the cache directly.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::CorsLayer;
use tracing::Level;

use crate::bus::{Address, BusError, EventBus, Headers};
use crate::core::{MarketDataAction, ACTION_HEADER};
use crate::infrastructure::metrics::{MetricsCollector, MetricsSnapshot};
use crate::{log_api, Result};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bus: EventBus,
    pub metrics: Arc<MetricsCollector>,
}

/// Build the bridge routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/metrics", get(get_metrics))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/marketdata", post(post_marketdata))
        .route("/ws/status", get(ws_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server, running until `shutdown` resolves
pub async fn start_server<F>(state: AppState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log_api!(Level::INFO, "API Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    log_api!(Level::INFO, "API Server stopped");
    Ok(())
}

/// Handler for /api/metrics
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Handler for /api/snapshot
/// Issues an init_paint over the bus and returns the reply
async fn get_snapshot(State(state): State<AppState>) -> Response {
    let outcome = state
        .bus
        .request(
            Address::MarketdataPublisher,
            Headers::for_action(MarketDataAction::InitPaint),
            Value::Null,
        )
        .await;
    bus_response(outcome)
}

/// Handler for POST /api/marketdata
/// Forwards the body with the `action` HTTP header, if any
async fn post_marketdata(
    State(state): State<AppState>,
    http_headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    let mut headers = Headers::new();
    if let Some(action) = http_headers.get(ACTION_HEADER) {
        headers.insert(ACTION_HEADER, String::from_utf8_lossy(action.as_bytes()));
    }
    let body = body.map(|Json(value)| value).unwrap_or(Value::Null);

    let outcome = state
        .bus
        .request(Address::MarketdataPublisher, headers, body)
        .await;
    bus_response(outcome)
}

/// Map a bus outcome to an HTTP response
fn bus_response(outcome: std::result::Result<Option<Value>, BusError>) -> Response {
    match outcome {
        Ok(Some(value)) => (StatusCode::OK, Json(value)).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(BusError::Failed(failure)) => (StatusCode::BAD_REQUEST, Json(failure)).into_response(),
        Err(e @ (BusError::NoConsumer(_) | BusError::Closed(_))) => {
            log_api!(Level::WARN, "Router unavailable: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
        Err(e @ BusError::AlreadyRegistered(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Handler for /ws/status
/// Streams every marketdata_status broadcast as a text frame
async fn ws_status(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let status = state.bus.subscribe(Address::MarketdataStatus);
    ws.on_upgrade(move |socket| stream_status(socket, status))
}

async fn stream_status(mut socket: WebSocket, mut status: broadcast::Receiver<Value>) {
    log_api!(Level::INFO, "Status subscriber connected");
    loop {
        tokio::select! {
            frame = next_status_frame(&mut status) => match frame {
                Some(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    log_api!(Level::INFO, "Status subscriber disconnected");
}

/// Next broadcast as a text frame, skipping past messages lost to lag.
/// `None` once the status channel is gone.
async fn next_status_frame(status: &mut broadcast::Receiver<Value>) -> Option<String> {
    loop {
        match status.recv().await {
            Ok(value) => return Some(value.to_string()),
            Err(RecvError::Lagged(skipped)) => {
                log_api!(Level::WARN, "Status subscriber lagged, skipped {} messages", skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
