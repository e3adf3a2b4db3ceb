use roomcast_client::PresenceChange;
use roomcast_core::{RoomKind, SignalMessage};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{SETTLE_TIMEOUT_MS, TestWorld, wait_for_presence};

#[tokio::test]
async fn test_silent_departure_converges_on_sync() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Whiteboard).await;

    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;
    let c = world.join(&room, "carol").await;
    let c_id = c.id().clone();

    for client in [&a, &b] {
        wait_for_presence(&client.session, SETTLE_TIMEOUT_MS, |set| set.len() == 3)
            .await
            .expect("Room never filled");
    }

    world.hub.disconnect(&c_id, false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(a.session.active_set().contains(&c_id), "Nobody announced C leaving yet");

    world.hub.sync_now();

    for client in [&a, &b] {
        let set = wait_for_presence(&client.session, SETTLE_TIMEOUT_MS, |set| !set.contains(&c_id))
            .await
            .expect("Sync did not remove C");
        assert_eq!(set.len(), 2);
    }

    a.session.close().await;
    b.session.close().await;
    c.session.close().await;
}

#[tokio::test]
async fn test_lost_goodbye_is_covered_by_membership() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Code).await;

    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;
    let b_id = b.id().clone();

    wait_for_presence(&a.session, SETTLE_TIMEOUT_MS, |set| set.contains(&b_id))
        .await
        .expect("A never saw B");

    let mut changes = a.session.presence_changes();
    world
        .hub
        .set_loss(|frame, _| frame.event == SignalMessage::LEAVE);

    b.session.close().await;

    wait_for_presence(&a.session, SETTLE_TIMEOUT_MS, |set| !set.contains(&b_id))
        .await
        .expect("B never left");

    let change = tokio::time::timeout(Duration::from_secs(1), changes.recv())
        .await
        .expect("No change reported")
        .unwrap();
    assert_eq!(change, PresenceChange::Left(b_id));

    world.hub.clear_loss();
    a.session.close().await;
}

#[tokio::test]
async fn test_rejoin_is_a_fresh_entry() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Whiteboard).await;

    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;
    let identity = b.session.local().identity.clone();
    let first_joined = b.session.local().joined_at;
    b.session.close().await;

    wait_for_presence(&a.session, SETTLE_TIMEOUT_MS, |set| !set.contains(&identity.id))
        .await
        .expect("B never left");

    let context = world.context(
        crate::utils::FakePeerFactory::new(),
        std::sync::Arc::new(roomcast_client::SampleDevices::new()),
    );
    tokio::time::sleep(Duration::from_millis(5)).await;
    let again = roomcast_client::RoomSession::open(&context, &room.id, identity.clone(), None)
        .await
        .unwrap()
        .joined()
        .expect("Rejoin denied");

    let set = wait_for_presence(&a.session, SETTLE_TIMEOUT_MS, |set| set.contains(&identity.id))
        .await
        .expect("Rejoin never showed up");
    assert!(set.get(&identity.id).unwrap().joined_at > first_joined);

    again.close().await;
    a.session.close().await;
}
