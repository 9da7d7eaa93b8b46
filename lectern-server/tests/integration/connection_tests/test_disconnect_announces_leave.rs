use lectern_core::{PeerId, RoomId};

use crate::integration::{init_tracing, spawn_default_server};
use crate::utils::{RelayEvent, SIGNAL_TIMEOUT_MS, join_room, wait_for_join, wait_for_leave};

#[tokio::test]
async fn test_disconnect_announces_leave() {
    init_tracing();
    let server = spawn_default_server().await;

    let mut alice = join_room(server.addr, "L42", "alice").await.unwrap();
    let bob = join_room(server.addr, "L42", "bob").await.unwrap();
    wait_for_join(&mut alice, "bob").await.unwrap();

    bob.close().await.expect("Failed to close bob");

    wait_for_leave(&mut alice, "bob")
        .await
        .expect("alice should hear that bob left");

    let left = RelayEvent::PeerLeft(RoomId::from("L42"), PeerId::from("bob"));
    assert!(server.media_relay.wait_for(&left, SIGNAL_TIMEOUT_MS).await);
    assert_eq!(server.media_relay.count(&left), 1, "leave reported once");
}

#[tokio::test]
async fn test_dropped_socket_announces_leave() {
    init_tracing();
    let server = spawn_default_server().await;

    let mut alice = join_room(server.addr, "L42", "alice").await.unwrap();
    let bob = join_room(server.addr, "L42", "bob").await.unwrap();
    wait_for_join(&mut alice, "bob").await.unwrap();

    // No close handshake, the TCP stream just goes away.
    drop(bob);

    wait_for_leave(&mut alice, "bob")
        .await
        .expect("alice should hear that bob left");
}
