use roomcast_client::{AccessDenied, JoinOutcome, NewRoom, RoomStore, SampleDevices, StoreError};
use roomcast_core::{Room, RoomId, RoomKind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::integration::init_tracing;
use crate::utils::{SETTLE_TIMEOUT_MS, TestWorld, wait_for_presence};

fn denial(outcome: &JoinOutcome) -> Option<AccessDenied> {
    match outcome {
        JoinOutcome::Denied { reason, .. } => Some(*reason),
        JoinOutcome::Joined(_) => None,
    }
}

async fn wait_for_room<F>(world: &TestWorld, room: &RoomId, ready: F) -> Room
where
    F: Fn(&Room) -> bool,
{
    let start = Instant::now();
    loop {
        let stored = world.store.get_room(room).await.unwrap();
        if ready(&stored) {
            return stored;
        }
        assert!(
            start.elapsed() < Duration::from_millis(SETTLE_TIMEOUT_MS),
            "Room stuck at occupancy {} / present {}",
            stored.occupancy,
            stored.present
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_locked_room_needs_its_secret() {
    init_tracing();

    let world = TestWorld::new();
    let room = world
        .store
        .create_room(NewRoom::new("private", RoomKind::Whiteboard).locked())
        .await
        .unwrap();
    let devices = Arc::new(SampleDevices::new());

    let (outcome, _) = world.try_join(&room, "eve", devices.clone(), None).await;
    assert_eq!(denial(&outcome), Some(AccessDenied::SecretRequired));

    let (outcome, _) = world.try_join(&room, "eve", devices.clone(), Some("guess")).await;
    assert_eq!(denial(&outcome), Some(AccessDenied::BadSecret));

    let secret = room.access_secret.clone();
    let (outcome, _) = world.try_join(&room, "alice", devices, Some(&secret)).await;
    let session = outcome.joined().expect("Right secret was refused");
    assert_eq!(world.store.get_room(&room.id).await.unwrap().occupancy, 1);

    session.close().await;
    assert_eq!(world.store.get_room(&room.id).await.unwrap().occupancy, 0);
}

#[tokio::test]
async fn test_full_room_refuses_and_frees_up() {
    init_tracing();

    let world = TestWorld::new();
    let room = world
        .store
        .create_room(NewRoom::new("pair", RoomKind::Code).with_capacity(2))
        .await
        .unwrap();

    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;

    let (outcome, _) = world
        .try_join(&room, "carol", Arc::new(SampleDevices::new()), None)
        .await;
    assert_eq!(denial(&outcome), Some(AccessDenied::Full));
    if let JoinOutcome::Denied { room: Some(seen), .. } = &outcome {
        assert_eq!(seen.occupancy, 2);
    }

    assert!(matches!(
        world.store.delete_room(&room.id).await,
        Err(StoreError::Occupied(_))
    ));

    b.session.close().await;
    let (outcome, _) = world
        .try_join(&room, "carol", Arc::new(SampleDevices::new()), None)
        .await;
    let c = outcome.joined().expect("A seat was free again");

    a.session.close().await;
    wait_for_presence(&c, SETTLE_TIMEOUT_MS, |set| set.len() == 1)
        .await
        .expect("C still sees A");
    c.close().await;

    world.store.delete_room(&room.id).await.unwrap();
    let (outcome, _) = world
        .try_join(&room, "dave", Arc::new(SampleDevices::new()), None)
        .await;
    assert_eq!(denial(&outcome), Some(AccessDenied::NotFound));
}

#[tokio::test]
async fn test_presence_count_follows_the_active_set() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Whiteboard).await;

    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;
    wait_for_room(&world, &room.id, |r| r.present == 2).await;

    // B drops off without leaving; the live count follows the next sync but
    // B's seat stays taken until its session releases it.
    world.hub.disconnect(b.id(), false);
    world.hub.sync_now();

    wait_for_presence(&a.session, SETTLE_TIMEOUT_MS, |set| set.len() == 1)
        .await
        .expect("B is still present");
    let seen = wait_for_room(&world, &room.id, |r| r.present == 1).await;
    assert_eq!(seen.occupancy, 2);

    a.session.close().await;
    b.session.close().await;
    assert_eq!(world.store.get_room(&room.id).await.unwrap().occupancy, 0);
}

#[tokio::test]
async fn test_leaving_member_keeps_the_others_counted() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Whiteboard).await;

    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;
    wait_for_presence(&a.session, SETTLE_TIMEOUT_MS, |set| set.len() == 2)
        .await
        .expect("A never saw B");

    a.session.close().await;
    wait_for_presence(&b.session, SETTLE_TIMEOUT_MS, |set| set.len() == 1)
        .await
        .expect("B still sees A");
    // Give B's presence report time to land after A's release.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let seen = world.store.get_room(&room.id).await.unwrap();
    assert_eq!(seen.occupancy, 1);
    assert!(matches!(
        world.store.delete_room(&room.id).await,
        Err(StoreError::Occupied(_))
    ));

    b.session.close().await;
    assert_eq!(world.store.get_room(&room.id).await.unwrap().occupancy, 0);
    world.store.delete_room(&room.id).await.unwrap();
}
