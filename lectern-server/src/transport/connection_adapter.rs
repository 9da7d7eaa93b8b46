use crate::config::ConnectionConfig;
use crate::error::SignalingError;
use crate::room::{JoinRequest, RoomHandle};
use crate::transport::DisconnectReason;
use axum::extract::ws::Message;
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use lectern_core::{ConnectionId, PeerId, SignalMessage};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Upper bound on messages coalesced into one flush.
const MAX_WRITE_BATCH: usize = 32;

/// How long the closing handshake may take before the transport is abandoned.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bridges one duplex WebSocket connection to its room coordinator.
///
/// Owns a read loop and a write loop. Whichever loop stops first stops the
/// other; afterwards the transport is closed and the coordinator told to
/// drop the member, exactly once.
pub struct ConnectionAdapter {
    connection_id: ConnectionId,
    peer_id: PeerId,
    room: RoomHandle,
    config: ConnectionConfig,
    outbound_rx: mpsc::Receiver<SignalMessage>,
    shutdown: CancellationToken,
}

impl ConnectionAdapter {
    /// Joins `room` as `peer_id`. Fails if the room is draining.
    pub async fn register(
        room: &RoomHandle,
        peer_id: PeerId,
        config: ConnectionConfig,
    ) -> Result<Self, SignalingError> {
        let (outbound, outbound_rx) = mpsc::channel(room.outbound_queue());
        let shutdown = CancellationToken::new();
        let connection_id = ConnectionId::new();

        let peer_id = room
            .join(JoinRequest {
                connection_id,
                peer_id,
                outbound,
                shutdown: shutdown.clone(),
            })
            .await?;

        Ok(Self {
            connection_id,
            peer_id,
            room: room.clone(),
            config,
            outbound_rx,
            shutdown,
        })
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Drives the connection until either side fails or the member is evicted.
    pub async fn run<R, W, E>(self, reader: R, writer: W) -> DisconnectReason
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
        W: Sink<Message> + Unpin,
        W::Error: Display,
    {
        let Self {
            connection_id,
            peer_id,
            room,
            config,
            outbound_rx,
            shutdown,
        } = self;

        info!("Connection {} open for {:?}", connection_id, peer_id);

        let (read_reason, (mut writer, write_reason)) = tokio::join!(
            read_loop(reader, &room, connection_id, &peer_id, &config, shutdown.clone()),
            write_loop(writer, outbound_rx, &config, shutdown.clone()),
        );
        let reason = read_reason
            .or(write_reason)
            .unwrap_or(DisconnectReason::Evicted);

        let closing = async {
            if let Some(frame) = reason.close_frame() {
                let _ = writer.send(Message::Close(Some(frame))).await;
            }
            let _ = writer.close().await;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, closing).await.is_err() {
            warn!(
                "Connection {} for {:?} did not close within {:?}",
                connection_id, peer_id, CLOSE_TIMEOUT
            );
        }
        room.leave(connection_id).await;

        info!(
            "Connection {} for {:?} closed: {:?}",
            connection_id, peer_id, reason
        );
        reason
    }
}

/// Returns `None` when stopped by cancellation rather than by its own failure.
async fn read_loop<R, E>(
    mut reader: R,
    room: &RoomHandle,
    connection_id: ConnectionId,
    peer_id: &PeerId,
    config: &ConnectionConfig,
    shutdown: CancellationToken,
) -> Option<DisconnectReason>
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let _guard = shutdown.clone().drop_guard();

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return None,
            next = tokio::time::timeout(config.idle_timeout, reader.next()) => next,
        };

        let frame = match next {
            Err(_) => {
                warn!("No traffic from {:?} within {:?}", peer_id, config.idle_timeout);
                return Some(DisconnectReason::IdleTimeout);
            }
            Ok(None) => return Some(DisconnectReason::PeerClosed),
            Ok(Some(Err(e))) => return Some(DisconnectReason::ReadError(e.to_string())),
            Ok(Some(Ok(frame))) => frame,
        };

        let data: &[u8] = match &frame {
            Message::Text(text) => text.as_str().as_bytes(),
            Message::Binary(bytes) => bytes.as_ref(),
            // Any frame, pongs included, has already reset the idle timer.
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return Some(DisconnectReason::PeerClosed),
        };

        if data.len() > config.max_message_bytes {
            warn!(
                "Frame of {} bytes from {:?} exceeds limit of {}",
                data.len(),
                peer_id,
                config.max_message_bytes
            );
            return Some(DisconnectReason::MessageTooLarge(data.len()));
        }

        match serde_json::from_slice::<SignalMessage>(data) {
            Ok(message) => {
                debug!("{:?} from {:?}", message.kind, peer_id);
                if room.relay(connection_id, message).await.is_err() {
                    return Some(DisconnectReason::RoomClosed);
                }
            }
            Err(e) => warn!("Invalid SignalMessage from {:?}: {}", peer_id, e),
        }
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut outbound_rx: mpsc::Receiver<SignalMessage>,
    config: &ConnectionConfig,
    shutdown: CancellationToken,
) -> (W, Option<DisconnectReason>)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let _guard = shutdown.clone().drop_guard();

    let period = config.ping_period();
    let mut ping = tokio::time::interval_at(Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break None,

            _ = ping.tick() => {
                let ping = writer.send(Message::Ping(Bytes::new()));
                if let Err(reason) = guarded(ping, config.idle_timeout, &shutdown).await {
                    break reason;
                }
            }

            msg = outbound_rx.recv() => {
                // The coordinator dropped our queue: we are no longer a member.
                let Some(first) = msg else { break None };
                let batch = write_batch(&mut writer, first, &mut outbound_rx);
                if let Err(reason) = guarded(batch, config.idle_timeout, &shutdown).await {
                    break reason;
                }
            }
        }
    };

    (writer, reason)
}

/// Awaits one sink operation unless the connection shuts down first or the
/// peer stops accepting data for `limit`.
///
/// `Err(None)` means shutdown; `Err(Some(_))` means the write failed or stalled.
async fn guarded<F, E>(
    op: F,
    limit: Duration,
    shutdown: &CancellationToken,
) -> Result<(), Option<DisconnectReason>>
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => Err(None),
        res = tokio::time::timeout(limit, op) => match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Some(DisconnectReason::WriteError(e.to_string()))),
            Err(_) => Err(Some(DisconnectReason::WriteError(format!(
                "write stalled for {:?}",
                limit
            )))),
        },
    }
}

/// Writes `first` plus whatever is already queued, one frame per message,
/// then flushes once.
async fn write_batch<W>(
    writer: &mut W,
    first: SignalMessage,
    outbound_rx: &mut mpsc::Receiver<SignalMessage>,
) -> Result<(), W::Error>
where
    W: Sink<Message> + Unpin,
{
    let mut next = Some(first);
    let mut taken = 0;

    while let Some(message) = next {
        taken += 1;
        match serde_json::to_string(&message) {
            Ok(json) => writer.feed(Message::Text(json.into())).await?,
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
        next = if taken < MAX_WRITE_BATCH {
            outbound_rx.try_recv().ok()
        } else {
            None
        };
    }

    writer.flush().await
}
