mod connection;
mod peer;
mod room;
mod signaling;

pub use connection::ConnectionId;
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::{SignalKind, SignalMessage};
