//! # Publisher
//!
//! Publishing side of the backbone and the in-memory backbone itself.

use crate::error::TransportError;
use crate::message::{Acknowledger, Attributes, MessageId};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Trait for publishing messages to a topic.
///
/// Implementations must not retry on their own; a failure is returned to the
/// caller as-is.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload` with `attributes` on `topic`.
    ///
    /// # Returns
    ///
    /// The message id assigned by the backbone.
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        attributes: Attributes,
    ) -> Result<MessageId, TransportError>;
}

/// Per-subscription delivery counters.
#[derive(Debug, Default)]
pub struct SubscriptionStats {
    /// Messages handed to the consumer (including redeliveries).
    pub delivered: AtomicU64,
    /// Messages acknowledged.
    pub acked: AtomicU64,
    /// Messages handed back for redelivery.
    pub nacked: AtomicU64,
}

/// Queued message waiting to be pulled by a subscriber.
#[derive(Debug, Clone)]
pub(crate) struct Delivery {
    pub(crate) id: MessageId,
    pub(crate) payload: Vec<u8>,
    pub(crate) attributes: Attributes,
    pub(crate) attempt: u32,
}

/// A named subscription attached to one topic.
pub(crate) struct SubscriptionQueue {
    pub(crate) topic: String,
    pub(crate) sender: mpsc::UnboundedSender<Delivery>,
    pub(crate) receiver: Mutex<Option<mpsc::UnboundedReceiver<Delivery>>>,
    pub(crate) stats: Arc<SubscriptionStats>,
}

/// Acknowledger for in-memory subscriptions. Nacks requeue immediately.
pub(crate) struct QueueAcker {
    pub(crate) subscription: String,
    pub(crate) sender: mpsc::UnboundedSender<Delivery>,
    pub(crate) stats: Arc<SubscriptionStats>,
}

impl Acknowledger for QueueAcker {
    fn ack(&self, id: &MessageId) {
        self.stats.acked.fetch_add(1, Ordering::Relaxed);
        debug!(subscription = %self.subscription, message_id = %id, "Message acknowledged");
    }

    fn nack(&self, id: MessageId, payload: Vec<u8>, attributes: Attributes, delivery_attempt: u32) {
        self.stats.nacked.fetch_add(1, Ordering::Relaxed);
        let redelivery = Delivery {
            id,
            payload,
            attributes,
            attempt: delivery_attempt.saturating_add(1),
        };
        if self.sender.send(redelivery).is_err() {
            debug!(subscription = %self.subscription, "Redelivery dropped, subscription gone");
        }
    }
}

/// In-memory publish/subscribe backbone.
///
/// Topics fan out to every subscription attached to them; each subscription
/// is a queue drained by at most one consumer. Suitable for single-process
/// runs and tests; a deployment plugs a cloud backbone in behind the same
/// traits.
pub struct InMemoryPubSub {
    /// Topic name -> attached subscription names.
    topics: RwLock<HashMap<String, Vec<String>>>,

    /// Subscription name -> queue.
    pub(crate) subscriptions: RwLock<HashMap<String, Arc<SubscriptionQueue>>>,

    /// Total messages accepted by `publish`.
    messages_published: AtomicU64,
}

impl InMemoryPubSub {
    /// Create an empty backbone with no topics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            messages_published: AtomicU64::new(0),
        }
    }

    /// Create a topic. Creating an existing topic is a no-op.
    pub fn create_topic(&self, topic: &str) {
        self.topics.write().entry(topic.to_string()).or_default();
    }

    /// Create a subscription on `topic`, creating the topic if needed.
    ///
    /// Only messages published after this call are delivered to it.
    pub fn create_subscription(&self, topic: &str, name: &str) -> Result<(), TransportError> {
        let mut subscriptions = self.subscriptions.write();
        if subscriptions.contains_key(name) {
            return Err(TransportError::SubscriptionExists(name.to_string()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        subscriptions.insert(
            name.to_string(),
            Arc::new(SubscriptionQueue {
                topic: topic.to_string(),
                sender,
                receiver: Mutex::new(Some(receiver)),
                stats: Arc::new(SubscriptionStats::default()),
            }),
        );
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(name.to_string());

        debug!(topic = topic, subscription = name, "Subscription created");
        Ok(())
    }

    /// Delivery counters for a subscription.
    pub fn subscription_stats(&self, name: &str) -> Option<Arc<SubscriptionStats>> {
        self.subscriptions
            .read()
            .get(name)
            .map(|queue| Arc::clone(&queue.stats))
    }

    /// Topic a subscription is attached to.
    pub fn subscription_topic(&self, name: &str) -> Option<String> {
        self.subscriptions
            .read()
            .get(name)
            .map(|queue| queue.topic.clone())
    }

    /// Total number of messages published.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for InMemoryPubSub {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        attributes: Attributes,
    ) -> Result<MessageId, TransportError> {
        let attached = self
            .topics
            .read()
            .get(topic)
            .cloned()
            .ok_or_else(|| TransportError::TopicNotFound(topic.to_string()))?;

        let id = MessageId::new(Uuid::new_v4().to_string());
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let subscriptions = self.subscriptions.read();
        let mut fanned_out = 0usize;
        for name in &attached {
            let Some(queue) = subscriptions.get(name) else {
                continue;
            };
            let delivery = Delivery {
                id: id.clone(),
                payload: payload.clone(),
                attributes: attributes.clone(),
                attempt: 1,
            };
            if queue.sender.send(delivery).is_ok() {
                fanned_out += 1;
            }
        }

        if fanned_out == 0 {
            warn!(topic = topic, message_id = %id, "Message dropped (no subscriptions)");
        } else {
            debug!(
                topic = topic,
                message_id = %id,
                subscriptions = fanned_out,
                "Message published"
            );
        }

        Ok(id)
    }
}
