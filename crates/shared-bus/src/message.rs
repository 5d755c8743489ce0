//! # Messages
//!
//! Types that travel over the backbone. Payloads are opaque bytes; everything
//! the backbone needs for routing and correlation lives in string attributes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// String attributes attached to every message.
pub type Attributes = HashMap<String, String>;

/// Identifier assigned by the backbone when a message is published.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a backbone-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settlement side of a delivered message.
///
/// Implemented by each backbone; the consumer only ever sees it through
/// [`ReceivedMessage::ack`] and [`ReceivedMessage::nack`].
pub trait Acknowledger: Send + Sync {
    /// Mark the message as processed.
    fn ack(&self, id: &MessageId);

    /// Hand the message back for redelivery.
    fn nack(&self, id: MessageId, payload: Vec<u8>, attributes: Attributes, delivery_attempt: u32);
}

/// A message delivered from a subscription.
///
/// Must be settled exactly once. A message dropped without `ack()` or
/// `nack()` is treated like an expired ack deadline and redelivered.
pub struct ReceivedMessage {
    id: MessageId,
    payload: Vec<u8>,
    attributes: Attributes,
    delivery_attempt: u32,
    acker: Option<Arc<dyn Acknowledger>>,
}

impl ReceivedMessage {
    /// Build a delivered message bound to its backbone acknowledger.
    pub fn new(
        id: MessageId,
        payload: Vec<u8>,
        attributes: Attributes,
        delivery_attempt: u32,
        acker: Arc<dyn Acknowledger>,
    ) -> Self {
        Self {
            id,
            payload,
            attributes,
            delivery_attempt,
            acker: Some(acker),
        }
    }

    /// Backbone message id.
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Raw payload bytes (possibly empty).
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// All attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Single attribute lookup.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// 1 for the first delivery, incremented on every redelivery.
    pub fn delivery_attempt(&self) -> u32 {
        self.delivery_attempt
    }

    /// Acknowledge the message. It will not be delivered again.
    pub fn ack(mut self) {
        if let Some(acker) = self.acker.take() {
            acker.ack(&self.id);
        }
    }

    /// Reject the message so the backbone redelivers it.
    pub fn nack(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(acker) = self.acker.take() {
            acker.nack(
                self.id.clone(),
                std::mem::take(&mut self.payload),
                std::mem::take(&mut self.attributes),
                self.delivery_attempt,
            );
        }
    }
}

impl Drop for ReceivedMessage {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ReceivedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceivedMessage")
            .field("id", &self.id)
            .field("payload_len", &self.payload.len())
            .field("attributes", &self.attributes)
            .field("delivery_attempt", &self.delivery_attempt)
            .finish()
    }
}
