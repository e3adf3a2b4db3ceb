use roomcast_client::PeerState;
use roomcast_core::RoomKind;

use crate::integration::init_tracing;
use crate::utils::{SETTLE_TIMEOUT_MS, TestWorld, wait_for_mesh};

#[tokio::test]
async fn test_reloaded_peer_gets_a_fresh_link() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Video).await;

    let b1 = world.join(&room, "bob").await;
    let a = world.join(&room, "alice").await;
    let b_id = b1.id().clone();

    let first = wait_for_mesh(&a.session, SETTLE_TIMEOUT_MS, |s| {
        s.peer(&b_id).is_some_and(|p| p.state == PeerState::Connected)
    })
    .await
    .expect("A never connected to B");
    let old = first.peer(&b_id).unwrap().clone();
    assert!(!old.initiator, "B was present first and should have offered");

    // B's client reloads: the old session drops silently and the same
    // identity comes back later than A.
    world.hub.disconnect(&b_id, false);
    let identity = b1.session.local().identity.clone();
    let b2 = world.join_as(&room, identity).await;
    world.hub.sync_now();

    let view = wait_for_mesh(&a.session, SETTLE_TIMEOUT_MS, |s| {
        s.peer(&b_id).is_some_and(|p| {
            p.connection != old.connection && p.state == PeerState::Connected
        })
    })
    .await
    .expect("A kept the link of B's old session");
    assert_eq!(view.peers.len(), 1);
    assert!(view.peer(&b_id).unwrap().initiator);

    wait_for_mesh(&b2.session, SETTLE_TIMEOUT_MS, |s| {
        s.peer(a.id()).is_some_and(|p| p.state == PeerState::Connected)
    })
    .await
    .expect("B never got an offer from A");

    let stale = a
        .peers
        .toward(&b_id)
        .into_iter()
        .find(|t| t.connection() == old.connection)
        .expect("Old transport not found");
    assert!(stale.is_closed());

    b2.session.close().await;
    b1.session.close().await;
    a.session.close().await;
}
