use roomcast_client::Workspace;
use roomcast_client::surface::DEFAULT_FILE;
use roomcast_core::{CodeEvent, RoomKind};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::TestWorld;

#[tokio::test]
async fn test_files_converge_last_write_wins() {
    init_tracing();

    let world = TestWorld::new();
    let room = world.room(RoomKind::Code).await;

    let a = world.join(&room, "alice").await;
    let b = world.join(&room, "bob").await;

    let a_sync = a.session.code().unwrap();
    let mut b_inbox = b.session.code().unwrap().subscribe();
    let mut b_files = Workspace::new();

    let events = [
        CodeEvent::FileAdd {
            name: "util.py".into(),
            content: "def f():\n    pass\n".into(),
        },
        CodeEvent::FileEdit {
            name: "util.py".into(),
            content: "def f():\n    return 1\n".into(),
        },
        CodeEvent::FileDelete {
            name: DEFAULT_FILE.into(),
        },
    ];
    for event in &events {
        a_sync.publish(event).unwrap();
    }

    for _ in 0..events.len() {
        let remote = tokio::time::timeout(Duration::from_secs(1), b_inbox.recv())
            .await
            .expect("Event lost")
            .unwrap();
        assert_eq!(remote.sender, *a.id());
        b_files.apply(&remote.event);
    }

    let file = b_files.file("util.py").expect("File missing");
    assert_eq!(file.content, "def f():\n    return 1\n");
    assert_eq!(file.language, "python");
    assert!(b_files.file(DEFAULT_FILE).is_none());
    assert_eq!(b_files.len(), 1);

    a.session.close().await;
    b.session.close().await;
}

#[tokio::test]
async fn test_surfaces_do_not_share_topics() {
    init_tracing();

    let world = TestWorld::new();
    let code = world.room(RoomKind::Code).await;

    let a = world.join(&code, "alice").await;
    let b = world.join(&code, "bob").await;

    let mut b_inbox = b.session.code().unwrap().subscribe();

    // Presence traffic on the room never shows up as code events.
    world.hub.sync_now();
    let c = world.join(&code, "carol").await;

    let nothing = tokio::time::timeout(Duration::from_millis(200), b_inbox.recv()).await;
    assert!(nothing.is_err());

    a.session.close().await;
    b.session.close().await;
    c.session.close().await;
}
