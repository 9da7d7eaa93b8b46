use crate::error::SignalingError;
use crate::room::room::JoinRequest;
use chrono::{DateTime, Utc};
use lectern_core::{ConnectionId, PeerId, RoomId, SignalMessage};
use tokio::sync::oneshot;

/// Requests processed, one at a time, by a room coordinator.
#[derive(Debug)]
pub enum RoomCommand {
    /// Admit a connection. Replies with the assigned peer id.
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<Result<PeerId, SignalingError>>,
    },

    /// Remove a connection. No-op if it is not a member.
    Leave { connection_id: ConnectionId },

    /// A message read from a member's connection.
    Relay {
        connection_id: ConnectionId,
        message: SignalMessage,
    },

    /// Report membership as the coordinator currently sees it.
    Snapshot { reply: oneshot::Sender<RoomSnapshot> },
}

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Created, no member has joined yet.
    Empty,
    Active,
    /// Last member gone; rejecting joins and about to exit.
    Draining,
    Removed,
}

#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub state: RoomState,
    pub peers: Vec<PeerId>,
    pub created_at: DateTime<Utc>,
}

impl RoomSnapshot {
    pub fn member_count(&self) -> usize {
        self.peers.len()
    }
}
