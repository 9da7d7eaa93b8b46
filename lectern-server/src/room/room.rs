use chrono::{DateTime, Utc};
use lectern_core::{ConnectionId, PeerId, RoomId, SignalMessage};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// What a connection adapter hands to the coordinator when asking to join.
#[derive(Debug)]
pub struct JoinRequest {
    pub connection_id: ConnectionId,
    pub peer_id: PeerId,
    /// Producer side of the adapter's bounded outbound queue.
    pub outbound: mpsc::Sender<SignalMessage>,
    /// Cancelled by the coordinator to force the adapter closed.
    pub shutdown: CancellationToken,
}

/// One admitted connection.
#[derive(Debug)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub peer_id: PeerId,
    pub joined_at: DateTime<Utc>,
    outbound: mpsc::Sender<SignalMessage>,
    shutdown: CancellationToken,
}

impl Member {
    pub fn enqueue(&self, message: SignalMessage) -> Result<(), TrySendError<SignalMessage>> {
        self.outbound.try_send(message)
    }

    /// Stops the member's adapter. Idempotent.
    pub fn shut_down(&self) {
        self.shutdown.cancel();
    }
}

impl From<JoinRequest> for Member {
    fn from(request: JoinRequest) -> Self {
        Self {
            connection_id: request.connection_id,
            peer_id: request.peer_id,
            joined_at: Utc::now(),
            outbound: request.outbound,
            shutdown: request.shutdown,
        }
    }
}

/// Membership of one room. Owned and mutated only by its coordinator.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    created_at: DateTime<Utc>,
    members: HashMap<ConnectionId, Member>,
    by_peer: HashMap<PeerId, ConnectionId>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            members: HashMap::new(),
            by_peer: HashMap::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds a member. The caller must have evicted any holder of the same peer id.
    pub fn insert(&mut self, member: Member) {
        self.by_peer
            .insert(member.peer_id.clone(), member.connection_id);
        self.members.insert(member.connection_id, member);
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Member> {
        let member = self.members.remove(connection_id)?;
        if self.by_peer.get(&member.peer_id) == Some(connection_id) {
            self.by_peer.remove(&member.peer_id);
        }
        Some(member)
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Member> {
        self.members.get(connection_id)
    }

    pub fn connection_for(&self, peer_id: &PeerId) -> Option<ConnectionId> {
        self.by_peer.get(peer_id).copied()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.members.keys().copied().collect()
    }

    /// Peer ids of all members, sorted.
    pub fn peer_ids(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.by_peer.keys().cloned().collect();
        peers.sort();
        peers
    }

    pub fn drain_members(&mut self) -> Vec<Member> {
        self.by_peer.clear();
        self.members.drain().map(|(_, member)| member).collect()
    }
}
