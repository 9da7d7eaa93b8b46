use crate::config::ConnectionConfig;
use crate::error::SignalingError;
use crate::room::RoomRegistry;
use crate::signaling::{Authenticator, Identity, create_room, room_exists, ws_handler};
use crate::transport::ConnectionAdapter;
use axum::Router;
use axum::routing::{get, post};
use lectern_core::{PeerId, RoomId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Attempts at admission; a draining room is forgotten before it refuses
/// anyone, so the second attempt reaches a fresh coordinator.
const ADMIT_ATTEMPTS: usize = 2;

struct SignalingInner {
    registry: RoomRegistry,
    authenticator: Arc<dyn Authenticator>,
    connection: ConnectionConfig,
}

/// Shared state of the HTTP/WebSocket surface.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(
        registry: RoomRegistry,
        authenticator: Arc<dyn Authenticator>,
        connection: ConnectionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                registry,
                authenticator,
                connection,
            }),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.inner.registry
    }

    pub fn connection_config(&self) -> &ConnectionConfig {
        &self.inner.connection
    }

    pub async fn authenticate(&self, credential: Option<String>) -> Result<Identity, SignalingError> {
        let credential = credential.ok_or(SignalingError::MissingCredential)?;
        let identity = self.inner.authenticator.verify(&credential).await?;
        Ok(identity)
    }

    /// Registers a new connection with the room, creating the room if needed.
    pub async fn admit(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
    ) -> Result<ConnectionAdapter, SignalingError> {
        let mut last_err = SignalingError::RoomClosed(room_id.clone());

        for attempt in 1..=ADMIT_ATTEMPTS {
            let room = self.inner.registry.get_or_create(room_id);
            match ConnectionAdapter::register(&room, peer_id.clone(), self.inner.connection.clone())
                .await
            {
                Ok(adapter) => return Ok(adapter),
                Err(SignalingError::RoomClosed(id)) => {
                    debug!("Room {:?} draining on attempt {}", id, attempt);
                    last_err = SignalingError::RoomClosed(id);
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Refusing {:?}: room {:?} kept closing", peer_id, room_id);
        Err(last_err)
    }

    pub fn into_router(self) -> Router {
        Router::new()
            .route("/rooms/{id}", post(create_room))
            .route("/rooms/{id}/exists", get(room_exists))
            .route("/rooms/{id}/signal", get(ws_handler))
            .with_state(self)
    }
}
