//! Stream Routes
//!
//! - GET /api/v1/stream/:path - Subscribe to further pages of an open query
//! - POST /api/v1/stream/:path - Publish (always refused)
//!
//! A subscription upgrades to a WebSocket. Every continuation page is pushed
//! as a `frame` message; the stream ends with `done` or `error`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::dto::StreamMessage;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::datasource::{Datasource, StreamError, SubscribeStatus};
use crate::frame::Frame;

/// GET /api/v1/stream/:path
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    ws: Option<WebSocketUpgrade>,
) -> ApiResult<Response> {
    if state.datasource.subscribe_stream(&path).await == SubscribeStatus::NotFound {
        return Err(StreamError::NotFound(path).into());
    }
    let Some(ws) = ws else {
        return Err(ApiError::Validation(
            "stream subscriptions require a websocket upgrade".to_string(),
        ));
    };

    let datasource = Arc::clone(&state.datasource);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, datasource, path)))
}

/// POST /api/v1/stream/:path
pub async fn publish(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> ApiResult<()> {
    state.datasource.publish_stream(&path)?;
    Ok(())
}

fn encode(message: &StreamMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize stream message");
            None
        }
    }
}

/// Run the open query's stream and forward its frames to the socket
async fn handle_socket(socket: WebSocket, datasource: Arc<Datasource>, path: String) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

    let run_task = {
        let datasource = Arc::clone(&datasource);
        let path = path.clone();
        tokio::spawn(async move { datasource.run_stream(&path, tx).await })
    };

    let path_for_send = path.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let Some(message) = encode(&StreamMessage::Frame { frame }) else {
                continue;
            };
            if sender.send(message).await.is_err() {
                tracing::debug!(path = %path_for_send, "WebSocket send failed, closing stream");
                return;
            }
        }

        let last = match run_task.await {
            Ok(Ok(())) => StreamMessage::Done,
            Ok(Err(e)) => StreamMessage::Error {
                message: e.to_string(),
            },
            Err(e) => StreamMessage::Error {
                message: format!("stream task failed: {}", e),
            },
        };
        if let Some(message) = encode(&last) {
            let _ = sender.send(message).await;
        }
        let _ = sender.close().await;
    });

    let path_for_recv = path.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::debug!(path = %path_for_recv, "Client requested close");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(path = %path_for_recv, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Dropping the frame receiver stops the stream at its next wakeup
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    tracing::info!(path = %path, "stream subscriber disconnected");
}
