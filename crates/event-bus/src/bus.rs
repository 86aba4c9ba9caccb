//! In-memory bus with named direct queues and fan-out topics.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use crate::error::BusError;

struct Queue<M> {
    tx: mpsc::UnboundedSender<M>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<M>>>,
}

impl<M> Clone for Queue<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

#[derive(Default)]
struct BusInner<M> {
    queues: HashMap<String, Queue<M>>,
    // topic name -> names of bound queues
    bindings: HashMap<String, Vec<String>>,
}

/// In-memory event bus, generic over the message type.
///
/// Cheap to clone; all clones share the same queues and bindings.
pub struct EventBus<M> {
    inner: Arc<RwLock<BusInner<M>>>,
}

impl<M> Clone for EventBus<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M> Default for EventBus<M> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BusInner {
                queues: HashMap::new(),
                bindings: HashMap::new(),
            })),
        }
    }
}

impl<M: Clone + Send + 'static> EventBus<M> {
    /// Creates a new bus with no queues or topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a direct queue. Declaring an existing queue is a no-op.
    pub fn declare_queue(&self, name: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.queues.entry(name.to_string()).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            Queue {
                tx,
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            }
        });
    }

    /// Declares a fan-out topic. Declaring an existing topic is a no-op.
    pub fn declare_topic(&self, name: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.bindings.entry(name.to_string()).or_default();
    }

    /// Binds a declared queue to a declared topic. Every message published
    /// to the topic is copied to each bound queue.
    pub fn bind(&self, topic: &str, queue: &str) -> Result<(), BusError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.queues.contains_key(queue) {
            return Err(BusError::UnknownQueue(queue.to_string()));
        }
        let bound = inner
            .bindings
            .get_mut(topic)
            .ok_or_else(|| BusError::UnknownTopic(topic.to_string()))?;
        if !bound.iter().any(|q| q == queue) {
            bound.push(queue.to_string());
        }
        Ok(())
    }

    /// Publishes a message to a direct queue.
    pub fn publish(&self, queue: &str, message: M) -> Result<(), BusError> {
        let tx = {
            let inner = self.inner.read().unwrap();
            inner
                .queues
                .get(queue)
                .ok_or_else(|| BusError::UnknownQueue(queue.to_string()))?
                .tx
                .clone()
        };
        tx.send(message)
            .map_err(|_| BusError::Closed(queue.to_string()))
    }

    /// Publishes a message to a fan-out topic, copying it to every bound
    /// queue. Returns the number of copies delivered.
    pub fn publish_topic(&self, topic: &str, message: M) -> Result<usize, BusError> {
        let senders: Vec<(String, mpsc::UnboundedSender<M>)> = {
            let inner = self.inner.read().unwrap();
            let bound = inner
                .bindings
                .get(topic)
                .ok_or_else(|| BusError::UnknownTopic(topic.to_string()))?;
            bound
                .iter()
                .filter_map(|name| {
                    inner
                        .queues
                        .get(name)
                        .map(|q| (name.clone(), q.tx.clone()))
                })
                .collect()
        };

        let mut delivered = 0;
        for (name, tx) in senders {
            if tx.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!(queue = %name, topic = %topic, "dropping fan-out copy, queue closed");
            }
        }
        Ok(delivered)
    }

    /// Subscribes to a direct queue.
    ///
    /// Multiple subscriptions to the same queue compete for messages;
    /// each message is received by exactly one of them.
    pub fn subscribe(&self, queue: &str) -> Result<Subscription<M>, BusError> {
        let inner = self.inner.read().unwrap();
        let q = inner
            .queues
            .get(queue)
            .ok_or_else(|| BusError::UnknownQueue(queue.to_string()))?;
        Ok(Subscription {
            queue: queue.to_string(),
            rx: q.rx.clone(),
        })
    }
}

/// A consumer's handle on a direct queue.
///
/// Competing consumers share the underlying channel; `recv` hands out
/// each message exactly once among them, in FIFO order.
pub struct Subscription<M> {
    queue: String,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<M>>>,
}

impl<M> Subscription<M> {
    /// Receives the next message, waiting until one is published.
    /// Returns `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<M> {
        self.rx.lock().await.recv().await
    }

    /// Returns the next message if one is already queued.
    pub fn try_recv(&self) -> Option<M> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }

    /// Returns the queue name this subscription consumes from.
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_direct_queue_fifo_delivery() {
        let bus: EventBus<u32> = EventBus::new();
        bus.declare_queue("orders");
        let sub = bus.subscribe("orders").unwrap();

        for n in 0..5 {
            bus.publish("orders", n).unwrap();
        }
        for n in 0..5 {
            assert_eq!(sub.recv().await, Some(n));
        }
    }

    #[tokio::test]
    async fn test_competing_consumers_receive_each_message_once() {
        let bus: EventBus<u32> = EventBus::new();
        bus.declare_queue("work");
        let sub_a = bus.subscribe("work").unwrap();
        let sub_b = bus.subscribe("work").unwrap();

        for n in 0..10 {
            bus.publish("work", n).unwrap();
        }

        let mut seen = Vec::new();
        for _ in 0..10 {
            // drain by alternating consumers; each message shows up once
            if let Some(n) = sub_a.try_recv() {
                seen.push(n);
            } else if let Some(n) = sub_b.try_recv() {
                seen.push(n);
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fanout_copies_to_all_bound_queues() {
        let bus: EventBus<&'static str> = EventBus::new();
        bus.declare_topic("payment_failed");
        bus.declare_queue("inventory_payment_failed");
        bus.declare_queue("order_payment_failed");
        bus.bind("payment_failed", "inventory_payment_failed")
            .unwrap();
        bus.bind("payment_failed", "order_payment_failed").unwrap();

        let inv = bus.subscribe("inventory_payment_failed").unwrap();
        let ord = bus.subscribe("order_payment_failed").unwrap();

        let delivered = bus.publish_topic("payment_failed", "boom").unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(inv.recv().await, Some("boom"));
        assert_eq!(ord.recv().await, Some("boom"));
    }

    #[tokio::test]
    async fn test_unknown_queue_and_topic() {
        let bus: EventBus<u32> = EventBus::new();
        assert_eq!(
            bus.publish("nope", 1),
            Err(BusError::UnknownQueue("nope".to_string()))
        );
        assert_eq!(
            bus.publish_topic("nope", 1),
            Err(BusError::UnknownTopic("nope".to_string()))
        );
        assert!(matches!(
            bus.subscribe("nope"),
            Err(BusError::UnknownQueue(_))
        ));
        bus.declare_topic("t");
        assert_eq!(
            bus.bind("t", "missing"),
            Err(BusError::UnknownQueue("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_redeclare_is_noop() {
        let bus: EventBus<u32> = EventBus::new();
        bus.declare_queue("q");
        let sub = bus.subscribe("q").unwrap();
        bus.publish("q", 1).unwrap();

        // Redeclaring must not replace the channel.
        bus.declare_queue("q");
        bus.publish("q", 2).unwrap();

        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_duplicate_bind_delivers_single_copy() {
        let bus: EventBus<u32> = EventBus::new();
        bus.declare_topic("t");
        bus.declare_queue("q");
        bus.bind("t", "q").unwrap();
        bus.bind("t", "q").unwrap();

        let sub = bus.subscribe("q").unwrap();
        let delivered = bus.publish_topic("t", 7).unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(sub.recv().await, Some(7));
        assert!(sub.try_recv().is_none());
    }
}
