use lectern_core::{PeerId, SignalKind};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

use crate::integration::{init_tracing, spawn_default_server};
use crate::utils::{SIGNAL_TIMEOUT_MS, SILENCE_MS, broadcast, join_room, wait_for_join};

#[tokio::test]
async fn test_broadcast_excludes_sender() {
    init_tracing();
    let server = spawn_default_server().await;

    let mut alice = join_room(server.addr, "L42", "alice").await.unwrap();
    let mut bob = join_room(server.addr, "L42", "bob").await.unwrap();
    let mut carol = join_room(server.addr, "L42", "carol").await.unwrap();
    wait_for_join(&mut alice, "bob").await.unwrap();
    wait_for_join(&mut alice, "carol").await.unwrap();
    wait_for_join(&mut bob, "carol").await.unwrap();

    alice
        .send(&broadcast(json!({ "text": "hello class" })))
        .await
        .unwrap();

    for client in [&mut bob, &mut carol] {
        let message = client
            .recv_kind(SignalKind::Broadcast, SIGNAL_TIMEOUT_MS)
            .await
            .expect("every other member receives the broadcast");
        assert_eq!(message.from, Some(PeerId::from("alice")));
        assert_eq!(message.to, None);
        assert_eq!(message.payload, Some(json!({ "text": "hello class" })));
    }

    alice
        .expect_silence(SILENCE_MS)
        .await
        .expect("sender must not receive its own broadcast");
}

#[tokio::test]
async fn test_chat_and_presence_keep_their_type() {
    init_tracing();
    let server = spawn_default_server().await;

    let mut alice = join_room(server.addr, "L42", "alice").await.unwrap();
    let mut bob = join_room(server.addr, "L42", "bob").await.unwrap();
    wait_for_join(&mut alice, "bob").await.unwrap();

    bob.send_raw(Message::text(
        r#"{"type":"chat","to":"nobody","payload":{"text":"hi"}}"#.to_string(),
    ))
    .await
    .unwrap();
    bob.send_raw(Message::text(
        r#"{"type":"presence","payload":{"hand":"raised"}}"#.to_string(),
    ))
    .await
    .unwrap();

    let chat = alice.recv(SIGNAL_TIMEOUT_MS).await.unwrap();
    assert_eq!(chat.kind, SignalKind::Chat);
    assert_eq!(chat.from, Some(PeerId::from("bob")));
    assert_eq!(chat.to, None, "broadcasts carry no target");
    assert_eq!(chat.payload, Some(json!({ "text": "hi" })));

    let presence = alice.recv(SIGNAL_TIMEOUT_MS).await.unwrap();
    assert_eq!(presence.kind, SignalKind::Presence);
    assert_eq!(presence.payload, Some(json!({ "hand": "raised" })));

    bob.expect_silence(SILENCE_MS)
        .await
        .expect("sender must not receive its own chat");
}
