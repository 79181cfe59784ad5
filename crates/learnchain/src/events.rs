//! Event bus for committed records.
//!
//! Every committed operation is published once, after it is journaled.
//! Subscribers either see everything or join the room of one address and
//! see only the records that concern it. Publication never blocks the
//! commit path: a subscriber that falls behind by more than the buffer
//! skips ahead and is told how many records it missed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use learnchain_core::{Address, EventRecord};

/// Name of the room that carries records concerning `address`.
pub fn room_name(address: &Address) -> String {
    format!("user-{}", address.to_hex())
}

/// Fan-out of committed records to subscribers.
pub struct EventBus {
    sender: broadcast::Sender<Arc<EventRecord>>,
    published: AtomicU64,
}

impl EventBus {
    /// Create a bus that buffers up to `capacity` records per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    /// Subscribe to every record.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventRecord>> {
        self.sender.subscribe()
    }

    /// Join the room of `address`.
    pub fn subscribe_address(&self, address: Address) -> RoomSubscription {
        debug!(room = %room_name(&address), "room joined");
        RoomSubscription {
            address,
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish a record to all current subscribers.
    ///
    /// Returns the number of subscribers that received it. Having no
    /// subscribers is expected and not an error.
    pub fn publish(&self, record: Arc<EventRecord>) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let kind = record.event.kind();
        let seq = record.seq;
        match self.sender.send(record) {
            Ok(receivers) => {
                debug!(seq, event_type = kind, receivers, "event published");
                receivers
            }
            Err(_) => {
                debug!(seq, event_type = kind, "event published with no subscribers");
                0
            }
        }
    }

    /// Records published since the bus was created.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A subscription to the room of one address.
pub struct RoomSubscription {
    address: Address,
    receiver: broadcast::Receiver<Arc<EventRecord>>,
}

impl RoomSubscription {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn room(&self) -> String {
        room_name(&self.address)
    }

    /// Next record concerning this address.
    ///
    /// Returns `None` once the bus is gone. Records lost to lag are
    /// skipped with a warning.
    pub async fn recv(&mut self) -> Option<Arc<EventRecord>> {
        loop {
            match self.receiver.recv().await {
                Ok(record) => {
                    if record.event.participants().contains(&self.address) {
                        return Some(record);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(room = %self.room(), missed, "room subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-buffered record concerning this address, without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<EventRecord>> {
        loop {
            match self.receiver.try_recv() {
                Ok(record) => {
                    if record.event.participants().contains(&self.address) {
                        return Some(record);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(room = %self.room(), missed, "room subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnchain_core::Event;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn transfer(seq: u64, from: u8, to: u8) -> Arc<EventRecord> {
        Arc::new(EventRecord {
            seq,
            prev: None,
            timestamp: 0,
            event: Event::Transfer {
                from: addr(from),
                to: addr(to),
                amount: 1,
            },
        })
    }

    #[test]
    fn test_room_name() {
        assert_eq!(
            room_name(&addr(0xab)),
            format!("user-0x{}", "ab".repeat(20))
        );
    }

    #[tokio::test]
    async fn test_room_filters_by_participant() {
        let bus = EventBus::new(16);
        let mut room = bus.subscribe_address(addr(3));
        let mut all = bus.subscribe();

        bus.publish(transfer(1, 1, 2));
        bus.publish(transfer(2, 1, 3));

        assert_eq!(room.recv().await.unwrap().seq, 2);
        assert_eq!(all.recv().await.unwrap().seq, 1);
        assert_eq!(all.recv().await.unwrap().seq, 2);
        assert!(room.try_recv().is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(transfer(1, 1, 2)), 0);
        assert_eq!(bus.published(), 1);
    }

    #[tokio::test]
    async fn test_lagging_room_skips_ahead() {
        let bus = EventBus::new(2);
        let mut room = bus.subscribe_address(addr(2));
        for seq in 1..=5 {
            bus.publish(transfer(seq, 1, 2));
        }
        // Only the newest two records are still buffered.
        assert_eq!(room.recv().await.unwrap().seq, 4);
        assert_eq!(room.recv().await.unwrap().seq, 5);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_room() {
        let bus = EventBus::new(2);
        let mut room = bus.subscribe_address(addr(2));
        drop(bus);
        assert!(room.recv().await.is_none());
    }
}
