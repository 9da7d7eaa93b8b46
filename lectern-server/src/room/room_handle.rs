use crate::error::SignalingError;
use crate::room::room::JoinRequest;
use crate::room::room_command::{RoomCommand, RoomSnapshot};
use lectern_core::{ConnectionId, PeerId, RoomId, SignalMessage};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Cloneable request channel into one room coordinator.
///
/// `instance` distinguishes coordinators that served the same room id at
/// different times, so a draining coordinator never unregisters its successor.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    instance: Uuid,
    command_tx: mpsc::Sender<RoomCommand>,
    outbound_queue: usize,
}

impl RoomHandle {
    pub(crate) fn new(
        room_id: RoomId,
        command_tx: mpsc::Sender<RoomCommand>,
        outbound_queue: usize,
    ) -> Self {
        Self {
            room_id,
            instance: Uuid::new_v4(),
            command_tx,
            outbound_queue,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn instance(&self) -> Uuid {
        self.instance
    }

    /// Capacity members of this room should give their outbound queues.
    pub fn outbound_queue(&self) -> usize {
        self.outbound_queue
    }

    /// True once the coordinator has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    pub async fn join(&self, request: JoinRequest) -> Result<PeerId, SignalingError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join { request, reply }).await?;
        reply_rx.await.map_err(|_| self.closed())?
    }

    /// Fire-and-forget; a closed room has nothing left to leave.
    pub async fn leave(&self, connection_id: ConnectionId) {
        let _ = self.send(RoomCommand::Leave { connection_id }).await;
    }

    pub async fn relay(
        &self,
        connection_id: ConnectionId,
        message: SignalMessage,
    ) -> Result<(), SignalingError> {
        self.send(RoomCommand::Relay {
            connection_id,
            message,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, SignalingError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply }).await?;
        reply_rx.await.map_err(|_| self.closed())
    }

    async fn send(&self, command: RoomCommand) -> Result<(), SignalingError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| self.closed())
    }

    fn closed(&self) -> SignalingError {
        SignalingError::RoomClosed(self.room_id.clone())
    }
}
