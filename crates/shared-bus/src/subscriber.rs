//! # Subscriber
//!
//! Consuming side of the backbone.

use crate::error::TransportError;
use crate::message::{Acknowledger, ReceivedMessage};
use crate::publisher::{InMemoryPubSub, QueueAcker};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

/// Stream of deliveries from one subscription.
///
/// `Err` items are inbound transport failures; the stream may continue after
/// one. The stream ends when the backbone closes the subscription.
pub type MessageStream = BoxStream<'static, Result<ReceivedMessage, TransportError>>;

/// Trait for attaching to a named subscription.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Attach to `subscription` and return its delivery stream.
    async fn subscribe(&self, subscription: &str) -> Result<MessageStream, TransportError>;
}

#[async_trait]
impl Subscriber for InMemoryPubSub {
    async fn subscribe(&self, subscription: &str) -> Result<MessageStream, TransportError> {
        let queue = self
            .subscriptions
            .read()
            .get(subscription)
            .cloned()
            .ok_or_else(|| TransportError::SubscriptionNotFound(subscription.to_string()))?;

        let receiver = queue
            .receiver
            .lock()
            .take()
            .ok_or_else(|| TransportError::AlreadyAttached(subscription.to_string()))?;

        let acker: Arc<dyn Acknowledger> = Arc::new(QueueAcker {
            subscription: subscription.to_string(),
            sender: queue.sender.clone(),
            stats: Arc::clone(&queue.stats),
        });
        let stats = Arc::clone(&queue.stats);

        debug!(subscription = subscription, topic = %queue.topic, "Subscriber attached");

        let stream = UnboundedReceiverStream::new(receiver)
            .map(move |delivery| {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(ReceivedMessage::new(
                    delivery.id,
                    delivery.payload,
                    delivery.attributes,
                    delivery.attempt,
                    Arc::clone(&acker),
                ))
            })
            .boxed();

        Ok(stream)
    }
}
