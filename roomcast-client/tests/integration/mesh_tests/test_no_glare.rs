use roomcast_client::PeerState;
use roomcast_core::RoomKind;

use crate::integration::init_tracing;
use crate::utils::{SETTLE_TIMEOUT_MS, TestWorld, wait_for_mesh};

#[tokio::test]
async fn test_exactly_one_offer_per_pair() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Video).await;

    let mut clients = Vec::new();
    for name in ["ada", "grace", "linus", "barbara"] {
        clients.push(world.join(&room, name).await);
    }

    for client in &clients {
        wait_for_mesh(&client.session, SETTLE_TIMEOUT_MS, |s| {
            s.peers.len() == 3 && s.peers.iter().all(|p| p.state == PeerState::Connected)
        })
        .await
        .expect("Mesh never completed");
    }

    for (i, left) in clients.iter().enumerate() {
        for right in &clients[i + 1..] {
            let from_left = left.peers.toward(right.id());
            let from_right = right.peers.toward(left.id());
            assert_eq!(from_left.len(), 1, "One connection per pair");
            assert_eq!(from_right.len(), 1, "One connection per pair");

            let offers = from_left[0].offers() + from_right[0].offers();
            assert_eq!(offers, 1, "Exactly one side offered");
            assert_eq!(from_left[0].offers(), 1, "The earlier peer offered");
            assert_eq!(from_left[0].connection(), from_right[0].connection());
        }
    }

    for client in clients {
        client.session.close().await;
    }
}
