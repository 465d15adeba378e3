//! Wallet lifecycle events and their delivery bus.
//!
//! Producers never block on consumers: the bus is a bounded broadcast ring
//! and every subscriber drains it at its own pace. A subscriber that falls
//! more than the capacity behind loses its oldest pending events and is told
//! how many it missed; events carry a monotonically increasing sequence
//! number so gaps are detectable from the events themselves as well.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::account::Url;

/// Default per-bus event capacity before slow subscribers start losing their
/// oldest pending events.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// The kind of wallet lifecycle change, in the order each can first occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WalletEventKind {
    /// A new wallet was detected by a backend.
    Arrived = 0,
    /// A wallet was successfully opened.
    Opened = 1,
    /// A wallet departed or was removed.
    Dropped = 2,
}

/// A wallet lifecycle notification.
///
/// Ephemeral: events exist only on the bus's delivery queues and are never
/// persisted. The wallet is referenced by its locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletEvent {
    /// Locator of the wallet the event concerns.
    pub url: Url,
    /// What happened.
    pub kind: WalletEventKind,
    /// Bus-wide publish counter, increasing by one per event.
    pub sequence: u64,
}

/// Errors surfaced to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// The bus (and its backend) is gone.
    #[error("event bus closed")]
    Closed,
    /// The subscriber fell behind; its oldest pending events were dropped.
    /// Delivery continues from the oldest retained event, with no
    /// duplicates and no reordering.
    #[error("subscriber lagged, {missed} events dropped")]
    Lagged { missed: u64 },
    /// No event is pending right now.
    #[error("no event pending")]
    Empty,
}

/// Bounded fan-out bus for wallet events.
///
/// Cloning yields another producer handle onto the same bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WalletEvent>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a bus whose subscribers each buffer up to `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Never blocks; with no subscribers the event is dropped. Returns the
    /// sequence number assigned to the event.
    pub fn publish(&self, url: Url, kind: WalletEventKind) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let event = WalletEvent {
            url,
            kind,
            sequence,
        };
        // A send error only means nobody is listening right now.
        let _ = self.sender.send(event);
        sequence
    }

    /// Register a new subscriber.
    ///
    /// The subscriber sees every event published after this call, in
    /// publication order. Dropping the handle cancels delivery to this
    /// subscriber without affecting others.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscriber's handle onto the event bus.
///
/// Dropping the handle ends the subscription.
pub struct Subscription {
    receiver: broadcast::Receiver<WalletEvent>,
}

impl Subscription {
    /// Block until the next event arrives.
    ///
    /// Must not be called from inside an async runtime; async consumers
    /// should poll [`Subscription::try_recv`] instead.
    pub fn recv(&mut self) -> Result<WalletEvent, SubscriptionError> {
        match self.receiver.blocking_recv() {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Closed) => Err(SubscriptionError::Closed),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                Err(SubscriptionError::Lagged { missed })
            }
        }
    }

    /// Take the next pending event without blocking.
    pub fn try_recv(&mut self) -> Result<WalletEvent, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(event),
            Err(broadcast::error::TryRecvError::Empty) => Err(SubscriptionError::Empty),
            Err(broadcast::error::TryRecvError::Closed) => Err(SubscriptionError::Closed),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                Err(SubscriptionError::Lagged { missed })
            }
        }
    }

    /// Drain every currently pending event, stopping at the first gap or at
    /// quiescence.
    pub fn drain(&mut self) -> Vec<WalletEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(n: u8) -> Url {
        Url::new("test", &format!("wallet-{}", n))
    }

    #[test]
    fn test_event_kind_wire_order() {
        assert_eq!(WalletEventKind::Arrived as u8, 0);
        assert_eq!(WalletEventKind::Opened as u8, 1);
        assert_eq!(WalletEventKind::Dropped as u8, 2);
        assert!(WalletEventKind::Arrived < WalletEventKind::Opened);
        assert!(WalletEventKind::Opened < WalletEventKind::Dropped);
    }

    #[test]
    fn test_every_subscriber_sees_every_event_in_order() {
        let bus = EventBus::with_capacity(16);
        let mut subs: Vec<_> = (0..3).map(|_| bus.subscribe()).collect();

        for n in 0..5 {
            bus.publish(url(n), WalletEventKind::Arrived);
        }

        for sub in &mut subs {
            let events = sub.drain();
            assert_eq!(events.len(), 5);
            for (n, event) in events.iter().enumerate() {
                assert_eq!(event.url, url(n as u8));
                assert_eq!(event.sequence, n as u64);
            }
        }
    }

    #[test]
    fn test_subscriber_only_sees_events_after_subscribing() {
        let bus = EventBus::new();
        bus.publish(url(0), WalletEventKind::Arrived);
        let mut sub = bus.subscribe();
        bus.publish(url(1), WalletEventKind::Opened);

        let events = sub.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].url, url(1));
    }

    #[test]
    fn test_undersized_subscriber_observes_gap_not_duplicates() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();

        for n in 0..5 {
            bus.publish(url(n), WalletEventKind::Arrived);
        }

        // The oldest three events were dropped for this subscriber.
        match sub.try_recv() {
            Err(SubscriptionError::Lagged { missed }) => assert_eq!(missed, 3),
            other => panic!("expected lag, got {:?}", other),
        }

        // Delivery resumes in order with no duplicates.
        let events = sub.drain();
        let sequences: Vec<_> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![3, 4]);
    }

    #[test]
    fn test_cancelling_one_subscriber_leaves_others() {
        let bus = EventBus::new();
        let sub_a = bus.subscribe();
        let mut sub_b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub_a);
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(url(1), WalletEventKind::Dropped);
        assert_eq!(sub_b.drain().len(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_does_not_block_or_fail() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(url(1), WalletEventKind::Arrived), 0);
        assert_eq!(bus.publish(url(2), WalletEventKind::Arrived), 1);
    }

    #[test]
    fn test_try_recv_empty() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        assert_eq!(sub.try_recv(), Err(SubscriptionError::Empty));
    }
}
