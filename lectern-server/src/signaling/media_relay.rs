use lectern_core::{PeerId, RoomId};

/// Hooks into the external media relay (SFU) that forwards the actual
/// audio/video packets.
///
/// Called from inside a room coordinator, so implementations must return
/// promptly: hand the work to a channel or spawned task instead of awaiting I/O.
pub trait MediaRelay: Send + Sync {
    fn room_created(&self, room_id: &RoomId);

    fn room_destroyed(&self, room_id: &RoomId);

    fn peer_joined(&self, room_id: &RoomId, peer_id: &PeerId);

    fn peer_left(&self, room_id: &RoomId, peer_id: &PeerId);
}

/// Used when no media relay is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMediaRelay;

impl MediaRelay for NoopMediaRelay {
    fn room_created(&self, _room_id: &RoomId) {}

    fn room_destroyed(&self, _room_id: &RoomId) {}

    fn peer_joined(&self, _room_id: &RoomId, _peer_id: &PeerId) {}

    fn peer_left(&self, _room_id: &RoomId, _peer_id: &PeerId) {}
}
