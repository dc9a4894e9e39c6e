//! Page-created event plumbing for driver implementations.
//!
//! - [`EventBus`] is the sending side a driver keeps per browser session
//! - [`EventStream`] wraps a [`broadcast::Receiver`] with lag handling
//!
//! A stream only sees events emitted after it subscribed. Consumers that
//! cannot afford to miss an earlier event pair the stream with a scan of
//! current state, the way [`resolve_page`](crate::waiter::resolve_page) does.
//!
//! [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver

use tokio::sync::broadcast;
use tracing::warn;

use crate::driver::PageRef;

/// Stream of pages opened in a browser session.
pub type PageEvents = EventStream<PageRef>;

/// Broadcast dispatcher for session events.
pub struct EventBus<E: Clone + Send + 'static> {
	tx: broadcast::Sender<E>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
	/// Creates a new [`EventBus`] with the specified broadcast channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);
		Self { tx }
	}

	/// Emits an event to every current subscriber.
	///
	/// Emitting with no subscribers is not an error; the event is dropped.
	pub fn emit(&self, event: E) {
		let _ = self.tx.send(event);
	}

	/// Subscribes to events emitted from now on.
	pub fn subscribe(&self) -> EventStream<E> {
		EventStream::new(self.tx.subscribe())
	}

	/// Returns the number of active subscribers.
	pub fn subscriber_count(&self) -> usize {
		self.tx.receiver_count()
	}
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
	fn default() -> Self {
		Self::new(64)
	}
}

/// Wrapper around [`broadcast::Receiver`] that survives lag.
///
/// [`RecvError::Lagged`] is logged and skipped rather than surfaced, so a
/// slow consumer loses the dropped events but keeps receiving.
///
/// [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver
/// [`RecvError::Lagged`]: tokio::sync::broadcast::error::RecvError::Lagged
pub struct EventStream<E: Clone + Send + 'static> {
	rx: broadcast::Receiver<E>,
}

impl<E: Clone + Send + 'static> EventStream<E> {
	pub fn new(rx: broadcast::Receiver<E>) -> Self {
		Self { rx }
	}

	/// Receives the next event.
	///
	/// Returns `None` once the sending side is gone.
	pub async fn recv(&mut self) -> Option<E> {
		loop {
			match self.rx.recv().await {
				Ok(event) => return Some(event),
				Err(broadcast::error::RecvError::Lagged(n)) => {
					warn!(target = "testkit", dropped = n, "event stream lagged, dropped events");
				}
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	/// Receives the next event without waiting.
	pub fn try_recv(&mut self) -> Option<E> {
		loop {
			match self.rx.try_recv() {
				Ok(event) => return Some(event),
				Err(broadcast::error::TryRecvError::Lagged(n)) => {
					warn!(target = "testkit", dropped = n, "event stream lagged, dropped events");
				}
				Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => return None,
			}
		}
	}

	/// Receives events until one satisfies `predicate`.
	///
	/// Returns `None` if the channel closes first.
	pub async fn next_matching<F>(&mut self, mut predicate: F) -> Option<E>
	where
		F: FnMut(&E) -> bool,
	{
		while let Some(event) = self.recv().await {
			if predicate(&event) {
				return Some(event);
			}
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use super::*;

	#[derive(Clone, Debug, PartialEq)]
	struct Opened {
		id: u32,
		url: String,
	}

	fn opened(id: u32, url: &str) -> Opened {
		Opened { id, url: url.to_string() }
	}

	#[tokio::test]
	async fn broadcast_reaches_every_subscriber() {
		let bus: EventBus<Opened> = EventBus::new(16);
		let mut first = bus.subscribe();
		let mut second = bus.subscribe();
		assert_eq!(bus.subscriber_count(), 2);

		bus.emit(opened(1, "about:blank"));

		assert_eq!(first.recv().await, Some(opened(1, "about:blank")));
		assert_eq!(second.recv().await, Some(opened(1, "about:blank")));
	}

	#[tokio::test]
	async fn events_before_subscribe_are_not_seen() {
		let bus: EventBus<Opened> = EventBus::new(16);
		bus.emit(opened(1, "early"));
		let mut stream = bus.subscribe();
		assert_eq!(stream.try_recv(), None);
	}

	#[tokio::test]
	async fn next_matching_skips_other_events() {
		let bus = Arc::new(EventBus::<Opened>::new(16));
		let mut stream = bus.subscribe();

		let sender = Arc::clone(&bus);
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(10)).await;
			sender.emit(opened(1, "https://dapp.test"));
			sender.emit(opened(2, "chrome-extension://abc/notification.html"));
		});

		let event = stream.next_matching(|e| e.url.contains("notification")).await;
		assert_eq!(event.map(|e| e.id), Some(2));
	}

	#[tokio::test]
	async fn lagged_stream_keeps_receiving() {
		let bus: EventBus<Opened> = EventBus::new(2);
		let mut stream = bus.subscribe();
		for id in 0..5 {
			bus.emit(opened(id, "x"));
		}
		// The two newest survive the overflow.
		assert_eq!(stream.recv().await.map(|e| e.id), Some(3));
		assert_eq!(stream.recv().await.map(|e| e.id), Some(4));
	}

	#[tokio::test]
	async fn closed_bus_ends_stream() {
		let bus: EventBus<Opened> = EventBus::new(4);
		let mut stream = bus.subscribe();
		drop(bus);
		assert_eq!(stream.recv().await, None);
		assert_eq!(stream.next_matching(|_| true).await, None);
	}
}
