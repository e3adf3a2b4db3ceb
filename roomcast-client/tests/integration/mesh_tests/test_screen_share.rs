use roomcast_client::{MediaError, MeshEvent, SessionError};
use roomcast_core::RoomKind;

use crate::integration::init_tracing;
use crate::utils::{SETTLE_TIMEOUT_MS, TestWorld, wait_for_mesh, wait_until};

#[tokio::test]
async fn test_screen_share_round_trip() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Video).await;

    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;
    let (a_id, b_id) = (a.id().clone(), b.id().clone());

    let before = wait_for_mesh(&a.session, SETTLE_TIMEOUT_MS, |s| s.peers.len() == 1)
        .await
        .expect("Never connected");
    wait_for_mesh(&b.session, SETTLE_TIMEOUT_MS, |s| s.peers.len() == 1)
        .await
        .expect("Never connected");
    let camera = before.outgoing_video.clone().expect("Video rooms send the camera");
    let connection = before.peer(&b_id).unwrap().connection;

    let mut b_events = b.session.mesh_events().unwrap();
    let transport = a.peers.toward(&b_id).pop().unwrap();

    a.session.start_screen_share().await.expect("Share failed");

    let sharing = wait_for_mesh(&a.session, SETTLE_TIMEOUT_MS, |s| s.local_sharing)
        .await
        .unwrap();
    let screen = sharing.outgoing_video.clone().unwrap();
    assert_ne!(screen, camera);
    wait_until(SETTLE_TIMEOUT_MS, || transport.video().as_deref() == Some(screen.as_str()))
        .await
        .expect("Screen never reached the connection");

    let status = tokio::time::timeout(std::time::Duration::from_secs(1), async {
        loop {
            if let Ok(MeshEvent::ShareStatus { peer_id, sharing }) = b_events.recv().await {
                return (peer_id, sharing);
            }
        }
    })
    .await
    .expect("B never heard about the share");
    assert_eq!(status, (a_id.clone(), true));

    assert!(matches!(
        a.session.start_screen_share().await,
        Err(SessionError::Media(MediaError::AlreadyAcquired(_)))
    ));

    assert!(a.session.stop_screen_share().await.unwrap());
    wait_until(SETTLE_TIMEOUT_MS, || transport.video().as_deref() == Some(camera.as_str()))
        .await
        .expect("Camera was not restored");
    wait_for_mesh(&b.session, SETTLE_TIMEOUT_MS, |s| s.sharing.is_empty())
        .await
        .expect("B still thinks A is sharing");

    let after = a.session.mesh_snapshot().await.unwrap().unwrap();
    assert_eq!(after.outgoing_video.as_deref(), Some(camera.as_str()));
    assert_eq!(after.peer(&b_id).unwrap().connection, connection, "Connection was kept");
    assert_eq!(a.peers.created().len(), 1);
    assert!(!transport.is_closed());

    assert!(!a.session.stop_screen_share().await.unwrap(), "Nothing left to stop");

    a.session.close().await;
    b.session.close().await;
}

#[tokio::test]
async fn test_screen_share_needs_a_call_room() {
    init_tracing();

    let world = TestWorld::new();
    let board = world.room(RoomKind::Whiteboard).await;
    let a = world.join(&board, "alice").await;

    assert!(matches!(
        a.session.start_screen_share().await,
        Err(SessionError::NotACallRoom(RoomKind::Whiteboard))
    ));

    a.session.close().await;
}

#[tokio::test]
async fn test_voice_rooms_cannot_share_a_screen() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Voice).await;
    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;

    wait_for_mesh(&a.session, SETTLE_TIMEOUT_MS, |s| s.peers.len() == 1)
        .await
        .expect("Never connected");

    assert!(matches!(
        a.session.start_screen_share().await,
        Err(SessionError::Media(MediaError::NoVideo))
    ));
    let view = a.session.mesh_snapshot().await.unwrap().unwrap();
    assert!(!view.local_sharing);
    assert_eq!(view.outgoing_video, None);

    a.session.close().await;
    b.session.close().await;
}
