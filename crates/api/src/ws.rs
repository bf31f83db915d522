//! WebSocket push channel for platform events.
//!
//! Each connection gets its own subscription on the event bus; every
//! published [`PaymentEvent`] is forwarded as one JSON text frame.
//! Delivery is at-most-once: slow consumers drop lagged events.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use remit_events::PaymentEvent;
use tokio::sync::broadcast;

use crate::state::AppState;

/// GET /api/v1/events/ws -- upgrade and stream events until the client
/// disconnects or the bus closes.
pub async fn events_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let receiver = state.event_bus.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, receiver))
}

async fn stream_events(mut socket: WebSocket, mut receiver: broadcast::Receiver<PaymentEvent>) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    // Inbound frames are ignored; the channel is push-only.
                    Some(Ok(_)) => {}
                    // Client closed or errored.
                    _ => break,
                }
            }
            event = receiver.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(text) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Event push channel lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
    tracing::debug!("Event push connection closed");
}
