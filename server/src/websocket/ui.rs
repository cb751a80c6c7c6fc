use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use openscale_store::{Board, MemoryEeprom, SettingsStore};

use crate::AppState;

/// WebSocket endpoint for UI clients watching the settings
pub async fn ui_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_ui_socket(socket, state))
}

fn initial_state(state: &AppState, store: &SettingsStore<MemoryEeprom>) -> serde_json::Value {
    serde_json::json!({
        "type": "initial_state",
        "layout": store.layout(),
        "initialized": store.is_initialized(),
        "settings": store.load().ok(),
        "board": Board::for_layout(state.config.layout),
        "at": chrono::Utc::now()
    })
}

async fn handle_ui_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the snapshot so no change is missed
    let mut rx = state.ui_broadcast.subscribe();

    tracing::debug!("UI client connected");

    // Send initial state
    let store = state.store.read().await;
    let initial_state = initial_state(&state, &store);
    drop(store);

    if sender
        .send(Message::Text(initial_state.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    // Task to forward broadcasts to this client
    let send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Keep connection alive, handle pings
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Ping(data) => {
                // Pong is handled automatically by axum
                tracing::trace!("Ping received: {:?}", data);
            }
            Message::Close(_) => {
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    tracing::debug!("UI client disconnected");
}
