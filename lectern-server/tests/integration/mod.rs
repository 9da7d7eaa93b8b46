pub mod http_tests;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::Level;

use lectern_server::{
    ConnectionConfig, RoomConfig, RoomRegistry, SignalingService, StaticTokenAuthenticator,
};

use crate::utils::{MockMediaRelay, TEST_PEERS};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn test_authenticator() -> StaticTokenAuthenticator {
    TEST_PEERS
        .iter()
        .fold(StaticTokenAuthenticator::new(), |auth, (token, peer)| {
            auth.with_token(token, peer, "student")
        })
}

pub fn test_service(
    connection: ConnectionConfig,
    room: RoomConfig,
) -> (SignalingService, RoomRegistry, MockMediaRelay) {
    let media_relay = MockMediaRelay::new();
    let registry = RoomRegistry::new(room, Arc::new(media_relay.clone()));
    let service = SignalingService::new(
        registry.clone(),
        Arc::new(test_authenticator()),
        connection,
    );
    (service, registry, media_relay)
}

/// A signaling server bound to an ephemeral localhost port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: RoomRegistry,
    pub media_relay: MockMediaRelay,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_server(connection: ConnectionConfig, room: RoomConfig) -> TestServer {
    let (service, registry, media_relay) = test_service(connection, room);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, service.into_router()).await {
            tracing::error!("Test server failed: {}", e);
        }
    });

    TestServer {
        addr,
        registry,
        media_relay,
        handle,
    }
}

pub async fn spawn_default_server() -> TestServer {
    spawn_server(ConnectionConfig::default(), RoomConfig::default()).await
}

/// Connection settings with a short idle timeout, for keepalive tests.
pub fn short_idle(idle_ms: u64) -> ConnectionConfig {
    ConnectionConfig {
        idle_timeout: Duration::from_millis(idle_ms),
        ..ConnectionConfig::default()
    }
}
