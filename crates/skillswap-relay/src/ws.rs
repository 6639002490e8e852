//! WebSocket endpoint: admission, the per-connection session loop, and the
//! event dispatch that ties the registry, router and call board together.
//!
//! Each connection runs two halves: a writer task pumping the registry's
//! outbound queue into the socket, and the read loop below.  When the read
//! loop ends (close frame, transport error, client gone) the connection is
//! deregistered and any live call it was part of is torn down before the
//! socket task exits.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

use skillswap_shared::{
    ClientEvent, ConnectionId, Identity, NotificationCategory, RoomId, ServerEvent,
};

use crate::api::AppState;
use crate::error::RelayError;
use crate::registry::SessionRegistry;

#[derive(Deserialize)]
pub struct ConnectParams {
    token: Option<String>,
}

/// `GET /ws?token=...` -- admit, then upgrade.
///
/// The bearer credential travels once at connection establishment (query
/// parameter or `Authorization` header), never per-message.  A rejection
/// surfaces its structured reason in the response body before the transport
/// is closed.
pub async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, RelayError> {
    if !state.limiter.allow(addr.ip()).await {
        return Err(RelayError::TooManyRequests);
    }

    let credential = params
        .token
        .as_deref()
        .or_else(|| bearer_from_headers(&headers));

    let identity = state.gatekeeper.admit(credential).await?;

    Ok(ws.on_upgrade(move |socket| connection_loop(state, socket, identity)))
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn connection_loop(state: AppState, socket: WebSocket, identity: Identity) {
    let conn_id = ConnectionId::new();
    let (tx, mut rx) = SessionRegistry::channel();
    state.registry.register(conn_id, identity.clone(), tx).await;

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.to_json() {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "failed to serialize outbound event"),
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let Ok(message) = frame else { break };
        match message {
            Message::Text(text) => handle_frame(&state, conn_id, &identity, &text).await,
            Message::Close(_) => break,
            // Ping/pong are answered by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    handle_disconnect(&state, conn_id, &identity).await;
    writer.abort();
}

/// Parse and dispatch one inbound frame.  Unparseable frames are logged and
/// dropped; nothing is surfaced to peers.
pub(crate) async fn handle_frame(
    state: &AppState,
    conn_id: ConnectionId,
    identity: &Identity,
    text: &str,
) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(user = %identity.id.short(), error = %e, "dropping malformed frame");
            return;
        }
    };

    match event {
        ClientEvent::Join { room_id } => {
            // Personal rooms are joined at admission; honoring the explicit
            // join keeps older clients working, but only for their own room.
            if room_id.as_str() != identity.id.as_str() {
                warn!(
                    user = %identity.id.short(),
                    room = %room_id,
                    "join for a foreign personal room dropped"
                );
                return;
            }
            state.registry.join_room(conn_id, room_id).await;
        }

        ClientEvent::JoinCall { room_id } => {
            if !room_id.is_call_room_of(&identity.id) {
                warn!(
                    user = %identity.id.short(),
                    room = %room_id,
                    "join-call for a room the caller is not part of dropped"
                );
                return;
            }
            state.registry.join_room(conn_id, room_id).await;
        }

        ClientEvent::Offer {
            room_id,
            offer,
            call_type,
        } => {
            state.calls.on_offer(&room_id, &identity.id, call_type).await;
            state
                .router
                .send_to_room_except(
                    &room_id,
                    conn_id,
                    ServerEvent::Offer {
                        offer,
                        from: identity.id.clone(),
                        call_type,
                    },
                )
                .await;
        }

        ClientEvent::Answer { room_id, answer } => {
            state.calls.on_answer(&room_id).await;
            state
                .router
                .send_to_room_except(
                    &room_id,
                    conn_id,
                    ServerEvent::Answer {
                        answer,
                        from: identity.id.clone(),
                    },
                )
                .await;
        }

        ClientEvent::IceCandidate { room_id, candidate } => {
            // Forwarded unconditionally; buffering before the remote
            // description is set is the receiving client's concern.
            state
                .router
                .send_to_room_except(
                    &room_id,
                    conn_id,
                    ServerEvent::IceCandidate {
                        candidate,
                        from: identity.id.clone(),
                    },
                )
                .await;
        }

        ClientEvent::CallRejected { room_id } => {
            state.calls.on_reject(&room_id).await;
            state
                .router
                .send_to_room_except(
                    &room_id,
                    conn_id,
                    ServerEvent::CallRejected {
                        from: identity.id.clone(),
                    },
                )
                .await;
        }

        ClientEvent::CallEnded { room_id } => {
            state.calls.on_end(&room_id).await;
            state
                .router
                .send_to_room_except(
                    &room_id,
                    conn_id,
                    ServerEvent::CallEnded {
                        from: identity.id.clone(),
                    },
                )
                .await;
        }

        ClientEvent::SendMessage {
            receiver_id,
            message,
        } => {
            state
                .router
                .send_to_room(
                    &RoomId::personal(&receiver_id),
                    ServerEvent::ReceiveMessage {
                        sender: identity.id.clone(),
                        message,
                    },
                )
                .await;
        }

        ClientEvent::SendNotification { user_id, message } => {
            // Live-only push; durable notifications go through the
            // Notifier from domain logic instead.
            state
                .router
                .send_to_room(
                    &RoomId::personal(&user_id),
                    ServerEvent::ReceiveNotification {
                        category: NotificationCategory::System,
                        message,
                        sender: Some(identity.id.clone()),
                        timestamp: Utc::now(),
                    },
                )
                .await;
        }
    }
}

/// Deregister and treat connection loss as an implicit end for every call
/// room the connection was in with a live call.
pub(crate) async fn handle_disconnect(
    state: &AppState,
    conn_id: ConnectionId,
    identity: &Identity,
) {
    let rooms = state.registry.deregister(conn_id).await;

    for room in rooms {
        if !room.is_call_room_of(&identity.id) {
            continue;
        }
        if state.calls.on_peer_lost(&room).await {
            info!(room = %room, user = %identity.id.short(), "implicit call end after connection loss");
            state
                .router
                .send_to_room(
                    &room,
                    ServerEvent::CallEnded {
                        from: identity.id.clone(),
                    },
                )
                .await;
        }
    }
}
