use lectern_core::{PeerId, RoomId};

use crate::integration::{init_tracing, spawn_default_server};
use crate::utils::{RelayEvent, SIGNAL_TIMEOUT_MS, SILENCE_MS, get_peers, join_room};

#[tokio::test]
async fn test_single_peer_joins_room() {
    init_tracing();
    let server = spawn_default_server().await;

    let mut alice = join_room(server.addr, "L42", "alice")
        .await
        .expect("Failed to connect");

    let joined = RelayEvent::PeerJoined(RoomId::from("L42"), PeerId::from("alice"));
    assert!(
        server.media_relay.wait_for(&joined, SIGNAL_TIMEOUT_MS).await,
        "media relay should have been told about the join"
    );
    assert!(server.registry.contains(&RoomId::from("L42")));

    // A joiner is not told about itself, and the roster excludes the requester.
    alice
        .expect_silence(SILENCE_MS)
        .await
        .expect("no announcement for own join");
    let peers = get_peers(&mut alice).await.expect("get-peers failed");
    assert!(peers.is_empty(), "expected empty roster, got {:?}", peers);

    alice.close().await.expect("Failed to close client");
}
