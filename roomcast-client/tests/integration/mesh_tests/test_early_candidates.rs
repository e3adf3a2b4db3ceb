use roomcast_core::RoomKind;
use roomcast_core::utils::now_millis;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{SETTLE_TIMEOUT_MS, ScriptedPeer, TestWorld, wait_until};

#[tokio::test]
async fn test_candidates_ahead_of_the_answer_wait_for_it() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Voice).await;

    let a = world.join(&room, "alice").await;
    let mut late = ScriptedPeer::join(&world.hub, &room, "late", now_millis() + 60_000).await;

    let offered = late
        .expect_offer(SETTLE_TIMEOUT_MS)
        .await
        .expect("A never offered");

    late.candidate(a.id(), offered, 1);
    late.candidate(a.id(), offered, 2);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let transport = a
        .peers
        .toward(late.id())
        .pop()
        .expect("No transport toward the late peer");
    assert_eq!(transport.applied_candidates(), 0);

    late.answer(a.id(), offered);
    wait_until(SETTLE_TIMEOUT_MS, || transport.applied_candidates() == 2)
        .await
        .expect("Queued candidates were not applied after the answer");

    let report = a.session.close().await;
    assert_eq!(report.mesh.discarded_candidates, 0);
    late.close();
}

#[tokio::test]
async fn test_leaving_discards_unapplied_candidates() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Voice).await;

    let a = world.join(&room, "alice").await;
    let mut late = ScriptedPeer::join(&world.hub, &room, "late", now_millis() + 60_000).await;

    let offered = late
        .expect_offer(SETTLE_TIMEOUT_MS)
        .await
        .expect("A never offered");

    for n in 1..=3 {
        late.candidate(a.id(), offered, n);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let transport = a
        .peers
        .toward(late.id())
        .pop()
        .expect("No transport toward the late peer");

    let report = a.session.close().await;
    assert_eq!(report.mesh.closed_connections, 1);
    assert_eq!(report.mesh.discarded_candidates, 3);
    assert_eq!(transport.applied_candidates(), 0);
    assert!(transport.is_closed());
    late.close();
}
