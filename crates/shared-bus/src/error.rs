//! Transport-level errors.

use thiserror::Error;

/// Errors raised by the messaging backbone.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Publish target does not exist.
    #[error("topic not found: {0}")]
    TopicNotFound(String),

    /// Subscription name is unknown to the backbone.
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// A subscription with this name was already created.
    #[error("subscription already exists: {0}")]
    SubscriptionExists(String),

    /// Another consumer is already attached to this subscription.
    #[error("subscription already attached: {0}")]
    AlreadyAttached(String),

    /// The backbone refused the message.
    #[error("publish rejected: {0}")]
    Rejected(String),

    /// Connection to the backbone failed or dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backbone was shut down.
    #[error("transport closed")]
    Closed,
}
