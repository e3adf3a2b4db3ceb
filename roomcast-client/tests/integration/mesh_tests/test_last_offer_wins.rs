use roomcast_client::PeerState;
use roomcast_core::utils::now_millis;
use roomcast_core::{ConnectionId, RoomKind};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{
    SETTLE_TIMEOUT_MS, ScriptedPeer, TestWorld, wait_for_mesh, wait_for_presence, wait_until,
};

#[tokio::test]
async fn test_new_offer_replaces_the_link() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Video).await;

    // Present before A, so it is the side that offers.
    let mut early = ScriptedPeer::join(&world.hub, &room, "early", 1).await;
    let a = world.join(&room, "alice").await;
    wait_for_presence(&a.session, SETTLE_TIMEOUT_MS, |set| set.contains(early.id()))
        .await
        .expect("A never saw the early peer");

    let first = ConnectionId::new();
    early.offer(a.id(), first);
    let answered = early
        .expect_answer(SETTLE_TIMEOUT_MS)
        .await
        .expect("No answer to the first offer");
    assert_eq!(answered, first);

    let second = ConnectionId::new();
    early.offer(a.id(), second);
    let answered = early
        .expect_answer(SETTLE_TIMEOUT_MS)
        .await
        .expect("No answer to the second offer");
    assert_eq!(answered, second);

    let view = wait_for_mesh(&a.session, SETTLE_TIMEOUT_MS, |s| {
        s.peers.len() == 1 && s.peers[0].connection == second
    })
    .await
    .expect("The second offer did not take over");
    assert!(!view.peers[0].initiator);

    let transports = a.peers.toward(early.id());
    assert_eq!(transports.len(), 2);
    wait_until(SETTLE_TIMEOUT_MS, || {
        transports
            .iter()
            .all(|t| t.is_closed() == (t.connection() == first))
    })
    .await
    .expect("Only the replaced transport should be closed");

    // Signaling still addressed to the replaced connection goes nowhere.
    early.candidate(a.id(), first, 7);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let replaced = transports
        .iter()
        .find(|t| t.connection() == first)
        .unwrap();
    assert_eq!(replaced.applied_candidates(), 0);
    assert_eq!(a.peers.created().len(), 2);

    a.session.close().await;
    early.close();
}

#[tokio::test]
async fn test_answer_for_another_connection_is_dropped() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Video).await;

    let a = world.join(&room, "alice").await;
    let mut late = ScriptedPeer::join(&world.hub, &room, "late", now_millis() + 60_000).await;

    let offered = late
        .expect_offer(SETTLE_TIMEOUT_MS)
        .await
        .expect("A never offered");

    late.answer(a.id(), ConnectionId::new());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let view = a.session.mesh_snapshot().await.unwrap().unwrap();
    let link = view.peer(late.id()).expect("No link toward the late peer");
    assert_eq!(link.connection, offered);
    assert_eq!(link.state, PeerState::Connecting);

    late.answer(a.id(), offered);
    wait_for_mesh(&a.session, SETTLE_TIMEOUT_MS, |s| {
        s.peer(late.id()).is_some_and(|p| p.state == PeerState::Connected)
    })
    .await
    .expect("The matching answer was not applied");
    assert_eq!(a.peers.created().len(), 1);

    a.session.close().await;
    late.close();
}
