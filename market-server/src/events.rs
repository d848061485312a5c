//! Domain events - immutable facts published after each committed transition
//!
//! Events are broadcast to all subscribers; a send with no receivers is not
//! an error. No delivery guarantees beyond the in-process channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Domain event published after a committed state transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    OrderCreated {
        order_id: String,
        buyer_id: String,
        delivery_id: String,
        total_price: f64,
    },
    OrderPaid {
        order_id: String,
    },
    OrderDelivered {
        order_id: String,
    },
    OrderCancelled {
        order_id: String,
        reason: String,
    },
    DeliveryAccepted {
        delivery_id: String,
        order_id: String,
        driver_id: String,
        weight: f64,
    },
    RefundRequested {
        request_id: String,
        order_id: String,
    },
    RefundApproved {
        request_id: String,
        order_id: String,
        amount: f64,
    },
    RefundRejected {
        request_id: String,
        order_id: String,
    },
}

/// Broadcast bus for domain events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(event = ?event, "domain event");
        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
