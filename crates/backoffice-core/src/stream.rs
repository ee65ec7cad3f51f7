// ── Reactive slot streams ──
//
// Subscription type for consuming resource-slot changes from the DataStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::ResourceSlot;

/// A subscription to one resource slot.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct SlotStream {
    current: Arc<ResourceSlot>,
    receiver: watch::Receiver<Arc<ResourceSlot>>,
}

impl SlotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<ResourceSlot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Arc<ResourceSlot> {
        &self.current
    }

    pub fn latest(&self) -> Arc<ResourceSlot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<Arc<ResourceSlot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> SlotWatchStream {
        SlotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a fresh slot snapshot per mutation.
pub struct SlotWatchStream {
    inner: WatchStream<Arc<ResourceSlot>>,
}

impl Stream for SlotWatchStream {
    type Item = Arc<ResourceSlot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
