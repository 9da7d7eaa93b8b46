use crate::error::SignalingError;
use crate::signaling::{Identity, SignalingService, bearer_credential};
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{Sink, SinkExt, StreamExt};
use lectern_core::{RoomId, SignalMessage};
use serde::Deserialize;
use tracing::{info, warn};

/// The protocol layer drops frames beyond this multiple of the configured
/// limit; anything in between is refused by the adapter with a 1009 close.
const PROTOCOL_LIMIT_FACTOR: usize = 4;

#[derive(Debug, Default, Deserialize)]
pub struct SignalQuery {
    pub token: Option<String>,
}

/// `GET /rooms/{id}/signal`. The credential is verified before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    Query(query): Query<SignalQuery>,
    headers: HeaderMap,
    State(service): State<SignalingService>,
) -> Response {
    let credential = bearer_credential(query.token, &headers);
    let identity = match service.authenticate(credential).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejecting connection to room {:?}: {}", room_id, e);
            return e.into_response();
        }
    };

    let room_id = RoomId::from(room_id);
    let max_message_bytes = service.connection_config().max_message_bytes;
    ws.max_message_size(max_message_bytes.saturating_mul(PROTOCOL_LIMIT_FACTOR))
        .on_upgrade(move |socket| handle_socket(socket, room_id, identity, service))
}

async fn handle_socket(
    socket: WebSocket,
    room_id: RoomId,
    identity: Identity,
    service: SignalingService,
) {
    info!(
        "New WebSocket connection: {:?} ({}) for room {:?}",
        identity.peer_id, identity.role, room_id
    );

    let adapter = match service.admit(&room_id, identity.peer_id).await {
        Ok(adapter) => adapter,
        Err(e) => {
            refuse(socket, &e).await;
            return;
        }
    };

    let (sender, receiver) = socket.split();
    adapter.run(receiver, sender).await;
}

async fn refuse<W>(mut sink: W, err: &SignalingError)
where
    W: Sink<Message> + Unpin,
{
    warn!("Refusing WebSocket after upgrade: {}", err);

    if let Ok(json) = serde_json::to_string(&SignalMessage::error(err.code(), err.to_string())) {
        let _ = sink.send(Message::Text(json.into())).await;
    }
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: close_code::AGAIN,
            reason: err.code().into(),
        })))
        .await;
}
