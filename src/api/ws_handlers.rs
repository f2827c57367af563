//! WebSocket handler streaming broadcast notifications to clients

use super::gateway::GatewayState;
use crate::events::{normalize_namespace, BroadcastEvent, ROOT_NAMESPACE};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, Duration};
use tracing::{debug, warn};

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Query parameters selecting what a client receives
#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    /// Namespace to listen on (defaults to `/`)
    pub namespace: Option<String>,
    /// Comma-separated channels to join (e.g. "orders,invoices")
    pub channels: Option<String>,
}

/// What one connected client listens to
///
/// Namespace-wide events reach every client of the namespace; channel events
/// only reach clients that joined the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub namespace: String,
    pub channels: HashSet<String>,
}

impl Subscription {
    pub fn from_query(query: WsQuery) -> Result<Self, String> {
        let namespace = match query.namespace.as_deref().map(str::trim) {
            None | Some("") => ROOT_NAMESPACE.to_string(),
            Some(ns) => normalize_namespace(ns).map_err(|e| e.to_string())?,
        };
        let channels = query
            .channels
            .map(|channels| {
                channels
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            namespace,
            channels,
        })
    }

    pub fn accepts(&self, event: &BroadcastEvent) -> bool {
        if event.namespace != self.namespace {
            return false;
        }
        match &event.channel {
            Some(channel) => self.channels.contains(channel),
            None => true,
        }
    }
}

/// WebSocket upgrade handler for the events endpoint
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let subscription = match Subscription::from_query(query) {
        Ok(subscription) => subscription,
        Err(reason) => return (StatusCode::BAD_REQUEST, reason).into_response(),
    };

    ws.on_upgrade(move |socket| handle_ws(socket, state, subscription))
        .into_response()
}

/// Handle an individual WebSocket connection
async fn handle_ws(socket: WebSocket, state: GatewayState, subscription: Subscription) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut event_rx = state.bus.subscribe();

    let closed = state.bus.closed();
    tokio::pin!(closed);

    let mut ping_interval = interval(PING_INTERVAL);
    // Skip the first immediate tick
    ping_interval.tick().await;

    debug!(
        namespace = %subscription.namespace,
        channels = ?subscription.channels,
        "WebSocket events client connected"
    );

    loop {
        tokio::select! {
            result = event_rx.recv() => {
                match result {
                    Ok(event) => {
                        if !subscription.accepts(&event) {
                            continue;
                        }
                        match serde_json::to_string(&event) {
                            Ok(json) => {
                                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                                    debug!("WebSocket send failed, client disconnected");
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Failed to serialize BroadcastEvent: {}", e);
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, skipping events");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event bus closed, shutting down WebSocket");
                        break;
                    }
                }
            }

            _ = &mut closed => {
                debug!("Event bus closed, shutting down WebSocket");
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }

            _ = ping_interval.tick() => {
                if ws_sender.send(Message::Ping(vec![].into())).await.is_err() {
                    debug!("Ping failed, client disconnected");
                    break;
                }
            }

            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {}", e);
                        break;
                    }
                    // Pongs and client text/binary frames are ignored
                    _ => {}
                }
            }
        }
    }

    debug!("WebSocket connection closed");
}
