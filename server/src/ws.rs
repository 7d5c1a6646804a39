use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use doodle_shared::protocol::{decode_client_msg, ClientMsg, DecodeError, ServerMsg};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tower_http::cors::CorsLayer;

use crate::relay_loop::RelayCommand;

/// Body of the health-check route
pub const HEALTH_BODY: &str = "ok";

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub relay_tx: mpsc::Sender<RelayCommand>,
    pub connection_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(relay_tx: mpsc::Sender<RelayCommand>, max_connections: usize) -> Self {
        Self {
            relay_tx,
            connection_semaphore: Arc::new(Semaphore::new(max_connections)),
        }
    }
}

/// WebSocket endpoint at `/`, health check at `/health`.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn health_handler() -> &'static str {
    HEALTH_BODY
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    let permit = match app_state.connection_semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Connection limit reached, refusing upgrade");
            return (StatusCode::SERVICE_UNAVAILABLE, "relay full").into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, permit))
}

async fn handle_socket(socket: WebSocket, app_state: AppState, _permit: OwnedSemaphorePermit) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMsg>();

    // Join the relay; it queues our `connect` frame before anyone hears of us.
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .relay_tx
        .send(RelayCommand::PeerJoin {
            outbound: out_tx,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send PeerJoin command");
        return;
    }

    let my_id = match resp_rx.await {
        Ok(id) => id,
        Err(_) => {
            tracing::error!("Relay did not answer PeerJoin");
            return;
        }
    };

    tracing::info!(peer = %my_id, "Peer connected");

    loop {
        tokio::select! {
            // Client -> Relay
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match decode_client_msg(&text) {
                            Ok(ClientMsg::Position { position, rotation }) => {
                                let _ = app_state.relay_tx.send(RelayCommand::Position {
                                    id: my_id.clone(),
                                    position,
                                    rotation,
                                }).await;
                            }
                            Err(DecodeError::UnknownKind(kind)) => {
                                tracing::debug!(peer = %my_id, %kind, "Ignoring unknown message type");
                            }
                            Err(e) => {
                                tracing::warn!(peer = %my_id, error = %e, "Dropping bad message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %my_id, error = %e, "Socket error");
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Relay -> Client
            Some(out) = out_rx.recv() => {
                match serde_json::to_string(&out) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(peer = %my_id, error = %e, "Failed to encode {}", out.kind());
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .relay_tx
        .send(RelayCommand::PeerLeave { id: my_id.clone() })
        .await;
    tracing::info!(peer = %my_id, "Peer disconnected");
}
