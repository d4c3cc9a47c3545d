//! Session pump behaviour across a running tokio runtime.

use bytes::Bytes;
use pretty_assertions::assert_eq;
use rfb_common::{Rect, ZoomFactor};
use rfb_pixelbuffer::ScaleFilter;
use rfb_session::{event_loop, FramebufferStore, SessionEvent, ViewerEvent};
use std::sync::Arc;

fn patch(rect: Rect, px: [u8; 4]) -> SessionEvent {
    SessionEvent::FrameUpdate {
        rect,
        pixels: Bytes::from(px.repeat(rect.area() as usize)),
    }
}

fn new_store(zoom: u32) -> Arc<FramebufferStore> {
    Arc::new(FramebufferStore::new(
        64,
        48,
        ZoomFactor::new(i64::from(zoom)).unwrap(),
        ScaleFilter::Nearest,
    ))
}

#[tokio::test]
async fn disconnect_mid_burst_keeps_last_applied_patch() {
    let store = new_store(100);
    let (session_tx, session_rx) = flume::unbounded();
    let (viewer_tx, viewer_rx) = flume::unbounded();

    let full = Rect::new(0, 0, 64, 48);
    session_tx.send(patch(full, [10, 10, 10, 255])).unwrap();
    session_tx.send(patch(full, [20, 20, 20, 255])).unwrap();
    session_tx.send(SessionEvent::Disconnected).unwrap();
    session_tx.send(patch(full, [30, 30, 30, 255])).unwrap();
    drop(session_tx);

    let pump = event_loop::spawn(Arc::clone(&store), session_rx, viewer_tx);
    pump.await.unwrap();

    assert_eq!(store.snapshot().image.pixel(5, 5), Some([20, 20, 20, 255]));
    assert!(store.is_closed());

    let events: Vec<ViewerEvent> = viewer_rx.drain().collect();
    assert_eq!(
        events,
        vec![
            ViewerEvent::Damage { rect: full },
            ViewerEvent::Damage { rect: full },
            ViewerEvent::Disconnected,
        ]
    );
}

#[tokio::test]
async fn dropped_sender_counts_as_disconnect() {
    let store = new_store(150);
    let (session_tx, session_rx) = flume::unbounded();
    let (viewer_tx, viewer_rx) = flume::unbounded();

    session_tx
        .send(SessionEvent::Connected {
            width: 32,
            height: 16,
            name: "test".to_string(),
        })
        .unwrap();
    drop(session_tx);

    event_loop::spawn(Arc::clone(&store), session_rx, viewer_tx)
        .await
        .unwrap();

    assert_eq!(store.desktop_size(), (32, 16));
    assert_eq!(store.snapshot().local_size(), (48, 24));
    let events: Vec<ViewerEvent> = viewer_rx.drain().collect();
    assert_eq!(events.last(), Some(&ViewerEvent::Disconnected));
}

#[tokio::test]
async fn out_of_bounds_patch_changes_nothing() {
    let store = new_store(200);
    let (session_tx, session_rx) = flume::unbounded();
    let (viewer_tx, viewer_rx) = flume::unbounded();
    let before = store.snapshot();

    session_tx
        .send(patch(Rect::new(60, 40, 10, 10), [255, 0, 0, 255]))
        .unwrap();
    session_tx.send(SessionEvent::Bell).unwrap();
    drop(session_tx);

    event_loop::spawn(Arc::clone(&store), session_rx, viewer_tx)
        .await
        .unwrap();

    let after = store.snapshot();
    assert_eq!(*after.image, *before.image);
    assert_eq!(after.version, before.version);
    let events: Vec<ViewerEvent> = viewer_rx.drain().collect();
    assert_eq!(events, vec![ViewerEvent::Bell, ViewerEvent::Disconnected]);
}

#[tokio::test]
async fn reconnect_with_new_size_reopens_store() {
    let store = new_store(100);
    let (session_tx, session_rx) = flume::unbounded();
    let (viewer_tx, viewer_rx) = flume::unbounded();

    session_tx.send(SessionEvent::Disconnected).unwrap();
    session_tx
        .send(SessionEvent::Connected {
            width: 32,
            height: 16,
            name: "again".to_string(),
        })
        .unwrap();
    let dot = Rect::new(31, 15, 1, 1);
    session_tx.send(patch(dot, [1, 2, 3, 255])).unwrap();
    drop(session_tx);

    event_loop::spawn(Arc::clone(&store), session_rx, viewer_tx)
        .await
        .unwrap();

    assert_eq!(store.desktop_size(), (32, 16));
    assert_eq!(store.snapshot().image.pixel(31, 15), Some([1, 2, 3, 255]));

    let events: Vec<ViewerEvent> = viewer_rx.drain().collect();
    assert_eq!(
        events,
        vec![
            ViewerEvent::Disconnected,
            ViewerEvent::Connected {
                width: 32,
                height: 16,
                name: "again".to_string(),
            },
            ViewerEvent::Damage { rect: dot },
            ViewerEvent::Disconnected,
        ]
    );
}
