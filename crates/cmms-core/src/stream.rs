// ── State subscriptions ──
//
// Controllers publish their state through a `watch` channel. A
// `StateStream` is one subscriber: a point-in-time snapshot plus change
// notification, convertible into a `Stream`.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to a controller's published state.
pub struct StateStream<S: Clone + Send + Sync + 'static> {
    current: S,
    receiver: watch::Receiver<S>,
}

impl<S: Clone + Send + Sync + 'static> StateStream<S> {
    pub(crate) fn new(mut receiver: watch::Receiver<S>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &S {
        &self.current
    }

    /// The latest published state.
    pub fn latest(&self) -> S {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publication, returning the new state.
    /// Returns `None` once the controller has been dropped.
    pub async fn changed(&mut self) -> Option<S> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current state first, then every change.
    pub fn into_stream(self) -> StateWatchStream<S> {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct StateWatchStream<S: Clone + Send + Sync + 'static> {
    inner: WatchStream<S>,
}

impl<S: Clone + Send + Sync + 'static> Stream for StateWatchStream<S> {
    type Item = S;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn changed_tracks_the_sender() {
        let (tx, rx) = watch::channel(1_u32);
        let mut sub = StateStream::new(rx);
        assert_eq!(*sub.current(), 1);

        tx.send_replace(2);
        assert_eq!(sub.latest(), 2);
        assert_eq!(sub.changed().await, Some(2));
        assert_eq!(*sub.current(), 2);

        drop(tx);
        assert_eq!(sub.changed().await, None);
    }

    #[tokio::test]
    async fn stream_yields_current_then_changes() {
        let (tx, rx) = watch::channel(String::from("a"));
        let mut stream = StateStream::new(rx).into_stream();
        assert_eq!(stream.next().await.unwrap(), "a");

        tx.send_replace("b".into());
        assert_eq!(stream.next().await.unwrap(), "b");
    }
}
