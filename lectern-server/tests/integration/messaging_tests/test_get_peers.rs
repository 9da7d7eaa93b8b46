use lectern_core::PeerId;

use crate::integration::{init_tracing, spawn_default_server};
use crate::utils::{get_peers, join_room, wait_for_join};

#[tokio::test]
async fn test_get_peers() {
    init_tracing();
    let server = spawn_default_server().await;

    let mut alice = join_room(server.addr, "L42", "alice").await.unwrap();
    let mut carol = join_room(server.addr, "L42", "carol").await.unwrap();
    let _bob = join_room(server.addr, "L42", "bob").await.unwrap();
    wait_for_join(&mut alice, "carol").await.unwrap();
    wait_for_join(&mut alice, "bob").await.unwrap();
    wait_for_join(&mut carol, "bob").await.unwrap();

    let peers = get_peers(&mut alice).await.expect("get-peers failed");
    assert_eq!(peers, vec![PeerId::from("bob"), PeerId::from("carol")]);

    let peers = get_peers(&mut carol).await.expect("get-peers failed");
    assert_eq!(peers, vec![PeerId::from("alice"), PeerId::from("bob")]);
}
