use anyhow::{Context, Result};
use lectern_core::{PeerId, RoomId, SignalKind, SignalMessage};
use lectern_server::RoomRegistry;
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;

use super::test_client::TestClient;

/// Timeout for signal exchange operations (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 5000;

/// How long a client must hear nothing before silence is accepted (ms).
pub const SILENCE_MS: u64 = 300;

/// Token table shared by every test server: `(token, peer_id)`.
pub const TEST_PEERS: &[(&str, &str)] = &[
    ("alice-token", "alice"),
    ("bob-token", "bob"),
    ("carol-token", "carol"),
    ("dave-token", "dave"),
    ("tutor-token", "T"),
    ("student-token", "S"),
];

pub fn token_for(peer: &str) -> &'static str {
    TEST_PEERS
        .iter()
        .find(|(_, p)| *p == peer)
        .map(|(token, _)| *token)
        .unwrap_or("unknown-token")
}

/// Connects `peer` to `room` using its test token.
pub async fn join_room(addr: SocketAddr, room: &str, peer: &str) -> Result<TestClient> {
    let client = TestClient::connect(addr, room, token_for(peer), peer)
        .await
        .with_context(|| format!("{peer} failed to join {room}"))?;
    tracing::debug!("[SignalHelper] {} connected to {}", peer, room);
    Ok(client)
}

/// Waits until `client` has seen a `join` announcement for `peer`.
pub async fn wait_for_join(client: &mut TestClient, peer: &str) -> Result<()> {
    wait_for_announcement(client, SignalKind::Join, peer).await
}

/// Waits until `client` has seen a `leave` announcement for `peer`.
pub async fn wait_for_leave(client: &mut TestClient, peer: &str) -> Result<()> {
    wait_for_announcement(client, SignalKind::Leave, peer).await
}

async fn wait_for_announcement(client: &mut TestClient, kind: SignalKind, peer: &str) -> Result<()> {
    let expected = PeerId::from(peer);
    loop {
        let message = client
            .recv_kind(kind, SIGNAL_TIMEOUT_MS)
            .await
            .with_context(|| format!("{:?} never saw {:?} for {peer}", client.peer_id, kind))?;
        if message.from.as_ref() == Some(&expected) {
            return Ok(());
        }
    }
}

pub fn offer_to(peer: &str, sdp: &str) -> SignalMessage {
    SignalMessage::new(SignalKind::Offer)
        .with_to(peer)
        .with_payload(json!({ "sdp": sdp }))
}

pub fn answer_to(peer: &str, sdp: &str) -> SignalMessage {
    SignalMessage::new(SignalKind::Answer)
        .with_to(peer)
        .with_payload(json!({ "sdp": sdp }))
}

pub fn ice_candidate_to(peer: &str, candidate: &str) -> SignalMessage {
    SignalMessage::new(SignalKind::IceCandidate)
        .with_to(peer)
        .with_payload(json!({ "candidate": candidate }))
}

pub fn broadcast(payload: serde_json::Value) -> SignalMessage {
    SignalMessage::new(SignalKind::Broadcast).with_payload(payload)
}

/// Asks the server for the current roster and returns it.
pub async fn get_peers(client: &mut TestClient) -> Result<Vec<PeerId>> {
    client.send(&SignalMessage::new(SignalKind::GetPeers)).await?;
    let reply = client.recv_kind(SignalKind::Peers, SIGNAL_TIMEOUT_MS).await?;
    Ok(reply.peer_list())
}

/// Polls until the registry no longer lists `room`.
pub async fn wait_for_room_removed(registry: &RoomRegistry, room: &str, timeout_ms: u64) -> bool {
    let room_id = RoomId::from(room);
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while registry.contains(&room_id) {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    true
}
