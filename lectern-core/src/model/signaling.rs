use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Wire-level message type. Unknown values fail to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Join,
    Leave,
    Broadcast,
    /// Broadcast-class, kept distinct so receivers can tell chat apart.
    Chat,
    /// Broadcast-class status updates (hand raised, muted, ...).
    Presence,
    Offer,
    Answer,
    IceCandidate,
    GetPeers,
    Peers,
    Error,
}

/// One JSON object per WebSocket frame.
///
/// `from` is never trusted on input: the room coordinator overwrites it with
/// the sender's authenticated peer id before anything is relayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl SignalMessage {
    pub fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            from: None,
            to: None,
            payload: None,
        }
    }

    pub fn with_to(mut self, to: impl Into<PeerId>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Announces that `peer_id` entered the room.
    pub fn join(peer_id: PeerId) -> Self {
        Self {
            from: Some(peer_id),
            ..Self::new(SignalKind::Join)
        }
    }

    /// Announces that `peer_id` left the room.
    pub fn leave(peer_id: PeerId) -> Self {
        Self {
            from: Some(peer_id),
            ..Self::new(SignalKind::Leave)
        }
    }

    /// Answer to `get-peers`: `{"peers": [...]}`.
    pub fn peers(peers: &[PeerId]) -> Self {
        Self::new(SignalKind::Peers).with_payload(json!({ "peers": peers }))
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::new(SignalKind::Error).with_payload(json!({
            "code": code,
            "message": message.into(),
        }))
    }

    /// Peer ids listed in a `peers` payload. Empty for any other message.
    pub fn peer_list(&self) -> Vec<PeerId> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("peers"))
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .unwrap_or_default()
    }
}
