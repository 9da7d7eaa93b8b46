use axum::extract::ws::{CloseFrame, close_code};

/// Why a connection adapter stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client sent a close frame or ended the stream.
    PeerClosed,
    /// Nothing, not even a pong, arrived within the idle timeout.
    IdleTimeout,
    /// Inbound frame of this many bytes exceeded the limit.
    MessageTooLarge(usize),
    ReadError(String),
    WriteError(String),
    /// The room coordinator removed this member.
    Evicted,
    /// The room stopped accepting messages.
    RoomClosed,
}

impl DisconnectReason {
    /// Close frame to send before closing the transport, if the transport is
    /// still writable.
    pub fn close_frame(&self) -> Option<CloseFrame> {
        let (code, reason) = match self {
            DisconnectReason::WriteError(_) => return None,
            DisconnectReason::PeerClosed | DisconnectReason::ReadError(_) => {
                (close_code::NORMAL, "bye")
            }
            DisconnectReason::IdleTimeout => (close_code::AWAY, "idle timeout"),
            DisconnectReason::MessageTooLarge(_) => (close_code::SIZE, "message too big"),
            DisconnectReason::Evicted => (close_code::POLICY, "removed from room"),
            DisconnectReason::RoomClosed => (close_code::AGAIN, "room closed"),
        };

        Some(CloseFrame {
            code,
            reason: reason.into(),
        })
    }
}
