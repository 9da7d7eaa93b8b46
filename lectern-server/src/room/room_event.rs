use chrono::{DateTime, Utc};
use lectern_core::{PeerId, RoomId, SignalMessage};

/// Append-only record of room activity, published for external history loggers.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub room_id: RoomId,
    /// Member the event concerns: the sender of a relayed message, or the
    /// subject of a join/leave.
    pub peer_id: PeerId,
    pub message: SignalMessage,
    pub at: DateTime<Utc>,
}

impl RoomEvent {
    pub fn now(room_id: RoomId, peer_id: PeerId, message: SignalMessage) -> Self {
        Self {
            room_id,
            peer_id,
            message,
            at: Utc::now(),
        }
    }
}
