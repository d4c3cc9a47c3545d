//! Session-event pump: drains [`SessionEvent`]s into the framebuffer store.

use crate::{
    messages::{SessionEvent, ViewerEvent},
    FramebufferHandle,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn the pump on the current tokio runtime.
///
/// Patches are applied in delivery order. A `Disconnected` event closes the
/// store but the pump keeps receiving, so a later `Connected` reopens it at
/// the new size. The task ends when the session side of the channel is
/// dropped, which also counts as a disconnect if the store is still open.
pub fn spawn(
    store: FramebufferHandle,
    events: flume::Receiver<SessionEvent>,
    viewer: flume::Sender<ViewerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = events.recv_async().await {
            handle_event(&store, event, &viewer);
        }
        debug!("Session channel closed");
        if !store.is_closed() {
            handle_event(&store, SessionEvent::Disconnected, &viewer);
        }
        debug!("Session pump stopped");
    })
}

/// Apply one session event and forward what the viewer needs to know.
pub fn handle_event(
    store: &FramebufferHandle,
    event: SessionEvent,
    viewer: &flume::Sender<ViewerEvent>,
) {
    let forward = match event {
        SessionEvent::Connected {
            width,
            height,
            name,
        } => {
            info!("Connected to {:?} ({}x{})", name, width, height);
            store.reset(width, height);
            Some(ViewerEvent::Connected {
                width,
                height,
                name,
            })
        }
        SessionEvent::FrameUpdate { rect, pixels } => store
            .apply_update(rect, &pixels)
            .is_applied()
            .then_some(ViewerEvent::Damage { rect }),
        SessionEvent::Bell => Some(ViewerEvent::Bell),
        SessionEvent::Clipboard { text } => Some(ViewerEvent::Clipboard { text }),
        SessionEvent::IoError { message } => {
            warn!("Session I/O error: {}", message);
            Some(ViewerEvent::IoError { message })
        }
        SessionEvent::Disconnected => {
            info!("Session disconnected");
            store.close();
            Some(ViewerEvent::Disconnected)
        }
    };

    if let Some(ev) = forward {
        // The presentation side may already be gone during shutdown.
        let _ = viewer.send(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::FramebufferStore;
    use bytes::Bytes;
    use rfb_common::{Rect, ZoomFactor};
    use rfb_pixelbuffer::ScaleFilter;
    use std::sync::Arc;

    fn store() -> FramebufferHandle {
        Arc::new(FramebufferStore::new(
            8,
            8,
            ZoomFactor::NATIVE,
            ScaleFilter::Nearest,
        ))
    }

    #[test]
    fn test_frame_update_forwards_damage() {
        let store = store();
        let (tx, rx) = flume::unbounded();
        let rect = Rect::new(0, 0, 2, 2);
        handle_event(
            &store,
            SessionEvent::FrameUpdate {
                rect,
                pixels: Bytes::from(vec![255u8; 16]),
            },
            &tx,
        );

        assert_eq!(rx.try_recv().unwrap(), ViewerEvent::Damage { rect });
    }

    #[test]
    fn test_dropped_patch_forwards_nothing() {
        let store = store();
        let (tx, rx) = flume::unbounded();
        handle_event(
            &store,
            SessionEvent::FrameUpdate {
                rect: Rect::new(7, 7, 2, 2),
                pixels: Bytes::from(vec![255u8; 16]),
            },
            &tx,
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_connected_resets_store() {
        let store = store();
        let (tx, rx) = flume::unbounded();
        store.close();
        handle_event(
            &store,
            SessionEvent::Connected {
                width: 20,
                height: 10,
                name: "desk".to_string(),
            },
            &tx,
        );

        assert_eq!(store.desktop_size(), (20, 10));
        assert!(!store.is_closed());
        assert!(matches!(rx.try_recv(), Ok(ViewerEvent::Connected { width: 20, .. })));
    }

    #[test]
    fn test_disconnect_closes_store() {
        let store = store();
        let (tx, rx) = flume::unbounded();
        handle_event(&store, SessionEvent::Disconnected, &tx);

        assert!(store.is_closed());
        assert_eq!(rx.try_recv().unwrap(), ViewerEvent::Disconnected);
    }
}
