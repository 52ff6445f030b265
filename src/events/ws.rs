//! WebSocket fan-out of analysis events.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use tracing::{debug, info, warn};

use super::bus::{AnalysisEvent, EventBus};

/// Build the `/ws` route over the given event bus.
pub fn event_routes(bus: Arc<EventBus>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(bus)
}

async fn ws_handler(ws: WebSocketUpgrade, State(bus): State<Arc<EventBus>>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, bus))
}

async fn handle_socket(mut socket: WebSocket, bus: Arc<EventBus>) {
    info!("WebSocket client connected");

    // Hello frame so clients can confirm the stream is live before any
    // analysis completes.
    if let Ok(json) = serde_json::to_string(&AnalysisEvent::EventStreamReady)
        && socket.send(Message::Text(json.into())).await.is_err()
    {
        warn!("Failed to send hello frame, client disconnected");
        return;
    }

    let mut rx = bus.subscribe();

    loop {
        tokio::select! {
            // Forward bus events to this client
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event)
                            && socket.send(Message::Text(json.into())).await.is_err()
                        {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        // Events are notifications, not state — lagging
                        // clients just miss some and keep going.
                        warn!(missed = n, "WS client lagged behind event stream");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Event bus closed");
                        break;
                    }
                }
            }

            // Keepalive / close handling for the client side
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}
