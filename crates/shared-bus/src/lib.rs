//! # Shared Bus - Publish/Subscribe Transport Contract
//!
//! The booking bridge never talks to the remote booking service directly.
//! Requests are published on an outbound topic and answers arrive later, in
//! any order, on a shared inbound subscription. This crate defines that
//! messaging backbone as two traits and ships an in-memory implementation.
//!
//! ## Contract
//!
//! ```text
//! ┌──────────────┐  publish(topic, payload, attributes)  ┌──────────────┐
//! │   Gateway    │ ────────────────────────────────────► │   Backbone   │
//! │              │                                       │  (topics +   │
//! │              │ ◄──────────────────────────────────── │ subscriptions)│
//! └──────────────┘   subscribe(name) -> stream of msgs   └──────────────┘
//!                     each message: ack() | nack()
//! ```
//!
//! - [`Publisher`]: fire-and-forget publish returning the backbone message id.
//! - [`Subscriber`]: attach to a named subscription and drain it as a stream.
//! - [`ReceivedMessage`]: payload + attributes, settled with `ack()` or `nack()`.
//!
//! Delivery guarantees, retries and ordering belong to the backbone, not to
//! the callers of this crate.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod message;
pub mod publisher;
pub mod subscriber;

pub use error::TransportError;
pub use message::{Acknowledger, Attributes, MessageId, ReceivedMessage};
pub use publisher::{InMemoryPubSub, Publisher, SubscriptionStats};
pub use subscriber::{MessageStream, Subscriber};

/// Attribute key carrying the operation name of an outbound request.
pub const ATTR_OPERATION: &str = "operation";

/// Attribute key carrying the correlation id on requests and responses.
pub const ATTR_CORRELATION_ID: &str = "correlationId";
