//! HTTP and WebSocket endpoints.
//!
//! Clients connect with a WebSocket upgrade on `/` (or `/ws`) and speak the
//! `reelproto` message protocol over text frames. `/health` reports liveness.

pub mod state;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use reelproto::ServerMessage;
use std::fmt::Display;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::dispatch::{DispatchError, Dispatcher, Outbox};

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": state.uptime_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.active_connections(),
    }))
}

async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

async fn handle_socket(socket: WebSocket, peer: SocketAddr, state: AppState) {
    let id = Uuid::new_v4();
    let span = info_span!("connection", %peer, connection.id = %id);
    let _active = state.track_connection();

    async move {
        info!("Client connected");
        let (sink, stream) = socket.split();
        serve_connection(stream, sink, state.dispatcher(), state.shutdown.clone()).await;
        info!("Client disconnected");
    }
    .instrument(span)
    .await
}

/// Run one connection's message loop until the client leaves, the transport
/// fails, a handler fails, or the server shuts down. The session is always
/// closed on the way out.
pub async fn serve_connection<S, K>(
    mut stream: S,
    sink: K,
    mut dispatcher: Dispatcher,
    shutdown: CancellationToken,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    K: Sink<Message> + Unpin + Send,
    K::Error: Display + Send,
{
    let mut outbox = WsOutbox { sink };

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Server shutting down, closing connection");
                break;
            }
            next = stream.next() => next,
        };

        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                debug!("Connection closed by client");
                break;
            }
            Some(Ok(_)) => {
                debug!("Ignoring non-text frame");
                continue;
            }
            Some(Err(e)) => {
                warn!(error = %e, "WebSocket receive failed");
                break;
            }
        };

        // A get_frames waiting on a stalled producer only ends here
        let result = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Server shutting down during dispatch");
                break;
            }
            result = dispatcher.handle_text(text.as_str(), &mut outbox) => result,
        };

        if let Err(e) = result {
            error!(error = %e, "Closing connection after handler failure");
            break;
        }
    }

    dispatcher.close().await;
    if let Err(e) = outbox.sink.close().await {
        debug!(error = %e, "WebSocket close failed");
    }
}

/// Serializes replies onto a WebSocket sink.
struct WsOutbox<K> {
    sink: K,
}

#[async_trait]
impl<K> Outbox for WsOutbox<K>
where
    K: Sink<Message> + Unpin + Send,
    K::Error: Display + Send,
{
    async fn send(&mut self, message: ServerMessage) -> Result<(), DispatchError> {
        let text = message.to_json()?;
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| DispatchError::Closed(e.to_string()))
    }
}
