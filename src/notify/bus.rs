//! Per-subscriber bounded delivery queues.
//!
//! [`NotificationBus`] keeps one bounded FIFO per subscriber (rider or
//! unit) plus a `last_sent` slot. New events are dequeued exactly once;
//! when a stream polls an empty queue the last delivered event can be
//! re-served as an idempotent heartbeat. Queues live in memory only and
//! are rebuilt empty on process start and on `/api/initialize`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, RwLock};

/// Queue depth per subscriber. A full queue blocks the producer briefly;
/// sustained overflow surfaces as backpressure.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 10;

struct Subscriber<T> {
    tx: mpsc::Sender<T>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<T>>>,
    last_sent: Arc<Mutex<Option<T>>>,
}

impl<T> Subscriber<T> {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            last_sent: Arc::new(Mutex::new(None)),
        }
    }
}

/// Fan-out bus delivering status events to per-subscriber queues.
///
/// Producers are the trip state machine and the matcher; the consumer of
/// a given queue is whichever stream endpoint currently serves that
/// subscriber. Subscriber entries are created lazily on first publish or
/// first connect and survive disconnects, so events enqueued while a
/// party is offline are delivered on its next connect.
pub struct NotificationBus<K, T> {
    capacity: usize,
    subscribers: RwLock<HashMap<K, Subscriber<T>>>,
}

impl<K, T> NotificationBus<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    /// Creates a bus whose per-subscriber queues hold `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Enqueues an event for one subscriber, creating its queue on first
    /// use. Blocks while the subscriber's queue is full.
    pub async fn publish(&self, key: K, event: T) {
        let tx = {
            let mut map = self.subscribers.write().await;
            map.entry(key)
                .or_insert_with(|| Subscriber::new(self.capacity))
                .tx
                .clone()
        };
        if tx.send(event).await.is_err() {
            // Receiver replaced by a concurrent reset; the queue contract
            // says in-flight events may be dropped at that point.
            tracing::warn!("notification dropped during bus reset");
        }
    }

    /// Returns the consumer handle for one subscriber, creating its
    /// queue on first use.
    pub async fn handle(&self, key: K) -> SubscriberHandle<T> {
        let mut map = self.subscribers.write().await;
        let sub = map
            .entry(key)
            .or_insert_with(|| Subscriber::new(self.capacity));
        SubscriberHandle {
            rx: Arc::clone(&sub.rx),
            last_sent: Arc::clone(&sub.last_sent),
        }
    }

    /// Drops every queue and replay slot.
    pub async fn reset(&self) {
        self.subscribers.write().await.clear();
    }

    /// Number of subscribers with a live queue.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

/// Consumer side of one subscriber's queue.
///
/// A connected stream holds the handle for the duration of the
/// connection. The receiver sits behind a mutex so a reconnect cannot
/// race an old connection into double-consuming; the second consumer
/// parks until the first releases the queue.
pub struct SubscriberHandle<T> {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<T>>>,
    last_sent: Arc<Mutex<Option<T>>>,
}

impl<T: Clone> SubscriberHandle<T> {
    /// Awaits the next undelivered event. Each event is returned exactly
    /// once across the queue's lifetime and recorded as `last_sent`.
    pub async fn recv(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        let event = rx.recv().await?;
        if let Ok(mut slot) = self.last_sent.lock() {
            *slot = Some(event.clone());
        }
        Some(event)
    }

    /// Most recently delivered event, for idempotent heartbeat replay.
    /// Replays must not trigger delivery acknowledgments.
    #[must_use]
    pub fn last_sent(&self) -> Option<T> {
        self.last_sent.lock().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn publish_then_recv_delivers_in_fifo_order() {
        let bus: NotificationBus<u32, u32> = NotificationBus::new(SUBSCRIBER_QUEUE_DEPTH);
        bus.publish(7, 1).await;
        bus.publish(7, 2).await;
        bus.publish(7, 3).await;

        let handle = bus.handle(7).await;
        assert_eq!(handle.recv().await, Some(1));
        assert_eq!(handle.recv().await, Some(2));
        assert_eq!(handle.recv().await, Some(3));
    }

    #[tokio::test]
    async fn events_are_delivered_at_most_once() {
        let bus: NotificationBus<u32, u32> = NotificationBus::new(SUBSCRIBER_QUEUE_DEPTH);
        bus.publish(1, 42).await;

        let handle = bus.handle(1).await;
        assert_eq!(handle.recv().await, Some(42));

        let second = tokio::time::timeout(Duration::from_millis(50), handle.recv()).await;
        assert!(second.is_err(), "event must not be dequeued twice");
    }

    #[tokio::test]
    async fn last_sent_is_replayable_without_dequeue() {
        let bus: NotificationBus<u32, u32> = NotificationBus::new(SUBSCRIBER_QUEUE_DEPTH);
        let handle = bus.handle(9).await;
        assert!(handle.last_sent().is_none());

        bus.publish(9, 5).await;
        assert_eq!(handle.recv().await, Some(5));
        assert_eq!(handle.last_sent(), Some(5));
        assert_eq!(handle.last_sent(), Some(5));
    }

    #[tokio::test]
    async fn subscribers_are_isolated() {
        let bus: NotificationBus<u32, u32> = NotificationBus::new(SUBSCRIBER_QUEUE_DEPTH);
        bus.publish(1, 10).await;
        bus.publish(2, 20).await;

        let h2 = bus.handle(2).await;
        assert_eq!(h2.recv().await, Some(20));

        let h1 = bus.handle(1).await;
        assert_eq!(h1.recv().await, Some(10));
    }

    #[tokio::test]
    async fn full_queue_blocks_the_producer() {
        let bus: NotificationBus<u32, u32> = NotificationBus::new(2);
        bus.publish(3, 1).await;
        bus.publish(3, 2).await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), bus.publish(3, 3)).await;
        assert!(blocked.is_err(), "publish into a full queue must block");

        let handle = bus.handle(3).await;
        assert_eq!(handle.recv().await, Some(1));
        bus.publish(3, 3).await;
    }

    #[tokio::test]
    async fn reset_drops_queues_and_replay_slots() {
        let bus: NotificationBus<u32, u32> = NotificationBus::new(SUBSCRIBER_QUEUE_DEPTH);
        bus.publish(4, 99).await;
        let handle = bus.handle(4).await;
        assert_eq!(handle.recv().await, Some(99));

        bus.reset().await;
        assert_eq!(bus.subscriber_count().await, 0);

        let fresh = bus.handle(4).await;
        assert!(fresh.last_sent().is_none());
    }
}
