use roomcast_client::{MediaError, PeerState, SampleDevices, TrackSource};
use roomcast_core::RoomKind;
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{SETTLE_TIMEOUT_MS, TestWorld, wait_for_mesh, wait_for_presence};

#[tokio::test]
async fn test_denied_camera_keeps_the_client_present() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Video).await;

    let denied = Arc::new(SampleDevices::new());
    denied.deny(TrackSource::Camera);
    let a = world.join_with(&room, "no camera", denied.clone()).await;

    assert!(matches!(
        a.session.media_error(),
        Some(MediaError::PermissionDenied(_))
    ));
    assert_eq!(denied.open_count(TrackSource::Microphone), 0, "Nothing stays open");

    let b = world.join(&room, "bob").await;
    let c = world.join(&room, "carol").await;
    let c_id = c.id().clone();

    wait_for_presence(&a.session, SETTLE_TIMEOUT_MS, |set| set.len() == 3)
        .await
        .expect("A does not see the others");
    wait_for_presence(&b.session, SETTLE_TIMEOUT_MS, |set| set.contains(a.id()))
        .await
        .expect("B does not see A");

    wait_for_mesh(&b.session, SETTLE_TIMEOUT_MS, |s| {
        s.peer(&c_id).is_some_and(|p| p.state == PeerState::Connected)
    })
    .await
    .expect("B and C must connect regardless of A");

    let a_view = a.session.mesh_snapshot().await.unwrap().unwrap();
    assert!(!a_view.media_available);
    assert!(a_view.peers.is_empty());
    assert!(a.peers.created().is_empty());

    a.session.close().await;
    b.session.close().await;
    c.session.close().await;
}
