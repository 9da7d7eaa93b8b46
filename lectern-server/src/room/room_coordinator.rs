use crate::config::{MAX_TIMER_SECS, RoomConfig};
use crate::error::SignalingError;
use crate::room::room::{JoinRequest, Member, Room};
use crate::room::room_command::{RoomCommand, RoomSnapshot, RoomState};
use crate::room::room_event::RoomEvent;
use crate::room::room_registry::RoomRegistry;
use crate::signaling::MediaRelay;
use lectern_core::{ConnectionId, PeerId, Route, RoomId, SignalMessage};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Why a member left the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaveReason {
    /// The adapter closed and asked to be removed.
    Left,
    /// Outbound queue full.
    Overloaded,
    /// Outbound queue already closed by the adapter.
    Disconnected,
    /// Another connection joined with the same peer id.
    Replaced,
}

/// Single owner of one room's state.
///
/// Every join, leave and relay is processed in arrival order off one queue;
/// nothing here awaits anything except that queue, so a slow member can never
/// stall the room.
pub struct RoomCoordinator {
    room: Room,
    instance: Uuid,
    state: RoomState,
    command_rx: mpsc::Receiver<RoomCommand>,
    registry: RoomRegistry,
    config: RoomConfig,
    media_relay: Arc<dyn MediaRelay>,
    /// When set, the room tears down at this instant unless someone joins.
    idle_deadline: Option<Instant>,
}

impl RoomCoordinator {
    pub(crate) fn new(
        room_id: RoomId,
        instance: Uuid,
        command_rx: mpsc::Receiver<RoomCommand>,
        registry: RoomRegistry,
    ) -> Self {
        let config = registry.config().clone();
        let media_relay = registry.media_relay();

        Self {
            room: Room::new(room_id),
            instance,
            state: RoomState::Empty,
            command_rx,
            registry,
            idle_deadline: Some(deadline_after(config.unclaimed_room_ttl)),
            config,
            media_relay,
        }
    }

    pub async fn run(mut self) {
        info!("Room {:?} event loop started", self.room.id());
        self.media_relay.room_created(self.room.id());

        while self.state != RoomState::Draining {
            let deadline = self.idle_deadline;

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c),
                        None => {
                            info!("Command channel closed. Shutting down room.");
                            self.state = RoomState::Draining;
                        }
                    }
                }

                _ = idle_expiry(deadline) => {
                    info!("Room {:?} idle, tearing down", self.room.id());
                    self.state = RoomState::Draining;
                }
            }

            if self.state == RoomState::Active && self.room.is_empty() && self.idle_deadline.is_none() {
                self.on_empty();
            }
        }

        self.drain().await;
        info!("Room {:?} event loop finished", self.room.id());
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { request, reply } => self.join(request, reply),
            RoomCommand::Leave { connection_id } => {
                self.remove_members(vec![(connection_id, LeaveReason::Left)]);
            }
            RoomCommand::Relay {
                connection_id,
                message,
            } => self.relay(connection_id, message),
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn join(
        &mut self,
        request: JoinRequest,
        reply: oneshot::Sender<Result<PeerId, SignalingError>>,
    ) {
        info!(
            "Processing JoinRequest for {:?} in room {:?}",
            request.peer_id,
            self.room.id()
        );

        if let Some(stale) = self.room.connection_for(&request.peer_id) {
            self.remove_members(vec![(stale, LeaveReason::Replaced)]);
        }

        let member = Member::from(request);
        let peer_id = member.peer_id.clone();
        let connection_id = member.connection_id;
        let others = self.room.connection_ids();

        if reply.send(Ok(peer_id.clone())).is_err() {
            debug!("Joiner {:?} went away before admission", peer_id);
            return;
        }

        self.room.insert(member);
        self.state = RoomState::Active;
        self.idle_deadline = None;

        self.media_relay.peer_joined(self.room.id(), &peer_id);
        let event = SignalMessage::join(peer_id.clone());
        self.publish(&peer_id, &event);

        let overflowed = self.fan_out(others, &event);
        self.remove_members(overflowed);

        debug!(
            "Room {:?} now has {} members (joined {})",
            self.room.id(),
            self.room.len(),
            connection_id
        );
    }

    fn relay(&mut self, connection_id: ConnectionId, mut message: SignalMessage) {
        let Some(sender) = self.room.get(&connection_id) else {
            debug!("Ignoring {:?} from non-member {}", message.kind, connection_id);
            return;
        };
        let sender_peer = sender.peer_id.clone();
        message.from = Some(sender_peer.clone());

        let overflowed = match message.kind.route() {
            Route::Unicast => {
                let target = message
                    .to
                    .as_ref()
                    .and_then(|to| self.room.connection_for(to));
                let Some(target) = target else {
                    debug!(
                        "Dropping {:?} from {:?}: target {:?} not in room",
                        message.kind, sender_peer, message.to
                    );
                    return;
                };
                self.publish(&sender_peer, &message);
                self.fan_out([target], &message)
            }

            Route::Broadcast => {
                message.to = None;
                let recipients: Vec<ConnectionId> = self
                    .room
                    .connection_ids()
                    .into_iter()
                    .filter(|id| self.config.echo_broadcasts || *id != connection_id)
                    .collect();
                self.publish(&sender_peer, &message);
                self.fan_out(recipients, &message)
            }

            Route::Query => {
                let peers: Vec<PeerId> = self
                    .room
                    .peer_ids()
                    .into_iter()
                    .filter(|p| *p != sender_peer)
                    .collect();
                self.fan_out([connection_id], &SignalMessage::peers(&peers))
            }

            Route::ServerOnly => {
                warn!(
                    "Dropping server-only {:?} sent by {:?}",
                    message.kind, sender_peer
                );
                return;
            }
        };

        self.remove_members(overflowed);
    }

    /// Enqueues without blocking. Returns the recipients that could not take it.
    fn fan_out(
        &self,
        recipients: impl IntoIterator<Item = ConnectionId>,
        message: &SignalMessage,
    ) -> Vec<(ConnectionId, LeaveReason)> {
        let mut failed = Vec::new();

        for id in recipients {
            let Some(member) = self.room.get(&id) else {
                continue;
            };
            match member.enqueue(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => failed.push((id, LeaveReason::Overloaded)),
                Err(TrySendError::Closed(_)) => failed.push((id, LeaveReason::Disconnected)),
            }
        }

        failed
    }

    /// Removes members and announces each departure. Members whose queues
    /// overflow on a `leave` announcement are removed in turn.
    fn remove_members(&mut self, initial: Vec<(ConnectionId, LeaveReason)>) {
        let mut pending = VecDeque::from(initial);

        while let Some((id, reason)) = pending.pop_front() {
            let Some(member) = self.room.remove(&id) else {
                continue;
            };
            member.shut_down();

            match reason {
                LeaveReason::Left => info!("{:?} left room {:?}", member.peer_id, self.room.id()),
                _ => warn!(
                    "Evicting {:?} from room {:?}: {:?}",
                    member.peer_id,
                    self.room.id(),
                    reason
                ),
            }

            self.media_relay.peer_left(self.room.id(), &member.peer_id);
            let event = SignalMessage::leave(member.peer_id.clone());
            self.publish(&member.peer_id, &event);

            let remaining = self.room.connection_ids();
            pending.extend(self.fan_out(remaining, &event));
        }
    }

    fn on_empty(&mut self) {
        if self.config.empty_room_grace.is_zero() {
            info!("Room {:?} is empty, draining", self.room.id());
            self.state = RoomState::Draining;
        } else {
            debug!(
                "Room {:?} is empty, waiting {:?} before teardown",
                self.room.id(),
                self.config.empty_room_grace
            );
            self.idle_deadline = Some(deadline_after(self.config.empty_room_grace));
        }
    }

    async fn drain(&mut self) {
        self.registry.forget(self.room.id(), self.instance);
        self.command_rx.close();

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RoomCommand::Join { request, reply } => {
                    debug!("Rejecting late join of {:?}", request.peer_id);
                    let _ = reply.send(Err(SignalingError::RoomClosed(self.room.id().clone())));
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                RoomCommand::Leave { .. } | RoomCommand::Relay { .. } => {}
            }
        }

        for member in self.room.drain_members() {
            member.shut_down();
        }

        self.state = RoomState::Removed;
        self.media_relay.room_destroyed(self.room.id());
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room.id().clone(),
            state: self.state,
            peers: self.room.peer_ids(),
            created_at: self.room.created_at(),
        }
    }

    fn publish(&self, peer_id: &PeerId, message: &SignalMessage) {
        self.registry.publish(RoomEvent::now(
            self.room.id().clone(),
            peer_id.clone(),
            message.clone(),
        ));
    }
}

/// Timers are capped at `MAX_TIMER_SECS` so an oversized config cannot overflow `Instant`.
fn deadline_after(after: Duration) -> Instant {
    Instant::now() + after.min(Duration::from_secs(MAX_TIMER_SECS))
}

async fn idle_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
