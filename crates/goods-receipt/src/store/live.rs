use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, FusedStream};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{Listener, ListenerRegistration, StoreError};

/// Continuously updated view of a store query.
///
/// Yields the current state first and then once per store-side change. The
/// sequence never completes on its own: it ends after yielding an error, when
/// the store drops the listener, or when the consumer closes or drops it. In
/// every case the underlying listener is released exactly once.
pub struct LiveSequence<T> {
    inner: BoxStream<'static, Result<T, StoreError>>,
    registration: ListenerRegistration,
    terminated: bool,
}

impl<T: Send + 'static> LiveSequence<T> {
    pub fn new<S>(stream: S, registration: ListenerRegistration) -> Self
    where
        S: Stream<Item = Result<T, StoreError>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
            registration,
            terminated: false,
        }
    }

    /// Decode every listener event synchronously.
    pub fn from_listener<E, F>(listener: Listener<E>, mut decode: F) -> Self
    where
        E: Send + 'static,
        F: FnMut(E) -> Result<T, StoreError> + Send + 'static,
    {
        let Listener {
            events,
            registration,
        } = listener;
        Self::new(receiver_stream(events).map(move |event| decode(event)), registration)
    }

    /// Resolve every listener event through an async step, one event at a time.
    pub fn from_listener_then<E, F, Fut>(listener: Listener<E>, resolve: F) -> Self
    where
        E: Send + 'static,
        F: FnMut(E) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        let Listener {
            events,
            registration,
        } = listener;
        Self::new(receiver_stream(events).then(resolve), registration)
    }

    /// Wait for the first emission, then release the listener.
    pub async fn first(mut self) -> Result<T, StoreError> {
        let outcome = self.next_value().await;
        self.close();
        outcome
    }

    /// Wait for the next value. An error, or the end of the sequence, comes
    /// back as `Err` and leaves the sequence closed.
    pub async fn next_value(&mut self) -> Result<T, StoreError> {
        match self.next().await {
            Some(result) => result,
            None => Err(StoreError::ListenerClosed(
                "sequence ended without a further emission".to_string(),
            )),
        }
    }
}

impl<T> LiveSequence<T> {
    /// Stop listening. Further polls yield `None`.
    pub fn close(&mut self) {
        self.terminated = true;
        self.registration.remove();
    }

    pub fn is_listening(&self) -> bool {
        !self.terminated && self.registration.is_active()
    }
}

fn receiver_stream<E: Send + 'static>(events: UnboundedReceiver<E>) -> impl Stream<Item = E> {
    stream::unfold(events, |mut events| async move {
        events.recv().await.map(|event| (event, events))
    })
}

impl<T> Stream for LiveSequence<T> {
    type Item = Result<T, StoreError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminated {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Err(err))) => {
                this.close();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.close();
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl<T> FusedStream for LiveSequence<T> {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<T> fmt::Debug for LiveSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSequence")
            .field("terminated", &self.terminated)
            .field("registration", &self.registration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn counted_listener(
        released: &Arc<AtomicUsize>,
    ) -> (mpsc::UnboundedSender<Result<u32, StoreError>>, Listener<Result<u32, StoreError>>) {
        let (sender, events) = mpsc::unbounded_channel();
        let counter = released.clone();
        let registration = ListenerRegistration::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (
            sender,
            Listener {
                events,
                registration,
            },
        )
    }

    #[tokio::test]
    async fn error_terminates_and_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        let (sender, listener) = counted_listener(&released);
        let mut sequence = LiveSequence::from_listener(listener, |event| event);

        sender.send(Ok(1)).expect("receiver alive");
        sender
            .send(Err(StoreError::Unavailable("offline".to_string())))
            .expect("receiver alive");
        sender.send(Ok(2)).expect("receiver alive");

        assert_eq!(sequence.next().await.expect("first").expect("ok"), 1);
        assert!(sequence.next().await.expect("second").is_err());
        assert!(sequence.next().await.is_none());
        assert!(sequence.is_terminated());
        drop(sequence);

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_returns_initial_value_and_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        let (sender, listener) = counted_listener(&released);
        let sequence = LiveSequence::from_listener(listener, |event| event.map(|n| n * 10));

        sender.send(Ok(4)).expect("receiver alive");

        assert_eq!(sequence.first().await.expect("value"), 40);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_reports_closed_listener() {
        let released = Arc::new(AtomicUsize::new(0));
        let (sender, listener) = counted_listener(&released);
        let sequence = LiveSequence::from_listener(listener, |event| event);
        drop(sender);

        match sequence.first().await {
            Err(StoreError::ListenerClosed(_)) => {}
            other => panic!("expected closed listener, got {other:?}"),
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn next_value_yields_values_then_the_error_then_closed() {
        let released = Arc::new(AtomicUsize::new(0));
        let (sender, listener) = counted_listener(&released);
        let mut sequence = LiveSequence::from_listener(listener, |event| event);

        sender.send(Ok(7)).expect("receiver alive");
        sender.send(Ok(8)).expect("receiver alive");
        sender
            .send(Err(StoreError::Unavailable("offline".to_string())))
            .expect("receiver alive");

        assert_eq!(sequence.next_value().await.expect("ok"), 7);
        assert_eq!(sequence.next_value().await.expect("ok"), 8);
        assert!(sequence.is_listening());

        match sequence.next_value().await {
            Err(StoreError::Unavailable(message)) => assert_eq!(message, "offline"),
            other => panic!("expected store error, got {other:?}"),
        }
        assert!(!sequence.is_listening());
        assert_eq!(released.load(Ordering::SeqCst), 1);

        match sequence.next_value().await {
            Err(StoreError::ListenerClosed(_)) => {}
            other => panic!("expected closed sequence, got {other:?}"),
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
