//! Admin WebSocket upgrade handler and per-connection read loop.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::AppState;

use super::events::{AdminMessage, ObserverMessage, OP_HEARTBEAT};
use super::publisher::{ObserverError, ObserverSink};

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/ws", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// The write half of an admin WebSocket, shared with the status publisher.
pub struct WsObserver {
    ws_tx: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsObserver {
    pub fn new(ws_tx: SplitSink<WebSocket, Message>) -> Self {
        Self {
            ws_tx: Mutex::new(ws_tx),
        }
    }

    async fn send_text(&self, text: String) -> Result<(), ObserverError> {
        self.ws_tx
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ObserverError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ObserverSink for WsObserver {
    async fn write_json(&self, payload: &Value) -> Result<(), ObserverError> {
        self.send_text(payload.to_string()).await
    }

    async fn close(&self) {
        let mut ws_tx = self.ws_tx.lock().await;
        let _ = ws_tx.send(Message::Close(None)).await;
        let _ = ws_tx.close().await;
    }
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (ws_tx, mut ws_rx) = socket.split();
    let observer = Arc::new(WsObserver::new(ws_tx));

    // Reserve the ID first so the HELLO frame precedes any status frame.
    let observer_id = matchcast_common::id::prefixed_ulid(matchcast_common::id::prefix::OBSERVER);
    let hello = match serde_json::to_value(AdminMessage::hello(&observer_id)) {
        Ok(v) => v,
        Err(err) => {
            tracing::error!(%err, "failed to encode HELLO");
            return;
        }
    };
    if observer.write_json(&hello).await.is_err() {
        return;
    }

    let observer_id = state
        .publisher
        .register_observer_with_id(observer_id, observer.clone())
        .await;

    tracing::info!(observer_id = %observer_id, "admin observer connected");

    // Observers only listen; reading is how a dead peer is noticed.
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Ok(client_msg) = serde_json::from_str::<ObserverMessage>(&text) else {
                    tracing::debug!(observer_id = %observer_id, "ignoring malformed observer frame");
                    continue;
                };
                if client_msg.op == OP_HEARTBEAT {
                    let ack = serde_json::to_value(AdminMessage::heartbeat_ack()).unwrap_or(Value::Null);
                    if observer.write_json(&ack).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(?e, observer_id = %observer_id, "observer read error");
                break;
            }
        }
    }

    state.publisher.unregister_observer(&observer_id).await;
    tracing::info!(observer_id = %observer_id, "admin observer disconnected");
}
