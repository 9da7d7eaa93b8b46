use crate::model::SignalKind;

/// Relay strategy for an inbound message.
///
/// New message types must be placed in exactly one of these; the `match` in
/// [`SignalKind::route`] is exhaustive so the compiler enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Delivered to the single member named in `to`.
    Unicast,
    /// Delivered to every member of the room.
    Broadcast,
    /// Answered by the coordinator itself, back to the requester only.
    Query,
    /// Produced by the server; a client sending one is a protocol error.
    ServerOnly,
}

impl SignalKind {
    pub fn route(self) -> Route {
        match self {
            SignalKind::Offer | SignalKind::Answer | SignalKind::IceCandidate => Route::Unicast,
            SignalKind::Broadcast | SignalKind::Chat | SignalKind::Presence => Route::Broadcast,
            SignalKind::GetPeers => Route::Query,
            SignalKind::Join | SignalKind::Leave | SignalKind::Peers | SignalKind::Error => {
                Route::ServerOnly
            }
        }
    }
}
