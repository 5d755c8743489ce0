//! Booking Gateway - synchronous booking operations over a publish/subscribe backbone.
//!
//! The remote booking service is only reachable through an outbound topic and a
//! shared inbound subscription. This crate turns that fire-and-forget channel
//! into independent, concurrently awaitable request/response pairs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           BOOKING GATEWAY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  caller ──► RequestHandler (one call = one state machine)               │
//! │               │  validate                                               │
//! │               │  register waiter ──────────┐                            │
//! │               │  publish                   ▼                            │
//! │               │                  ┌────────────────────┐                 │
//! │               │  await ◄──────── │ CorrelationRegistry│ ◄── sweeper     │
//! │               │                  │  id ─► waiter      │     (deadlines) │
//! │               ▼                  └─────────▲──────────┘                 │
//! │         MessagePublisher                   │ resolve                    │
//! │               │                   ResponseListener                      │
//! └───────────────┼────────────────────────────┼────────────────────────────┘
//!                 ▼                            │
//!          outbound topic              inbound subscription
//!                 │                            ▲
//!                 └────► remote booking service ┘
//! ```
//!
//! # Operations
//!
//! | Operation | Parameters | Result |
//! |-----------|------------|--------|
//! | `GetAllScheduleSlots` / `AvailableScheduleSlots` | none | payload as is |
//! | `UserScheduleSlots` | `userId` | payload, 404 when empty |
//! | `AllScheduleSlots` | none | inner `message` field |
//! | `BookedScheduleSlots` | none | inner `message` field, 404 when reported |
//! | `BookScheduleSlot` | `userId`, `scheduleSlotId`, `peopleQuantity` | inner `message` field, 400 when rejected |
//!
//! # Usage
//!
//! ```ignore
//! use booking_gateway::{BookingBridge, GatewayConfig, Params};
//!
//! let mut bridge = BookingBridge::new(GatewayConfig::from_env()?, publisher, subscriber)?;
//! bridge.start().await?;
//! let slots = bridge.handler().available_schedule_slots(&Params::new()).await?;
//! bridge.shutdown().await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod handler;
pub mod ipc;
pub mod service;

// Re-exports for public API
pub use domain::config::{GatewayConfig, TimeoutConfig, TransportConfig};
pub use domain::correlation::CorrelationId;
pub use domain::envelope::{RequestEnvelope, ResponseEnvelope};
pub use domain::error::{
    BridgeError, ConfigError, EnvelopeError, ErrorBody, RegistryError, ValidationError,
};
pub use domain::operation::{Operation, ResponseMapping};
pub use domain::validation::{validate, Params};
pub use handler::{Phase, RequestHandler};
pub use ipc::{CorrelationRegistry, MessagePublisher, ResponseListener, Settlement};
pub use service::BookingBridge;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
