//! Request handler: one synchronous call turned into a correlated exchange.
//!
//! ```text
//! Validating ──► Publishing ──► AwaitingResponse ──► Mapping ──► Done
//!     │              │                 │                │
//!     └──────────────┴─────────────────┴────────────────┴──────► Failed
//! ```
//!
//! The waiter is registered before the request is published so a fast
//! response cannot overtake its registration. A failed publish deregisters the
//! waiter right away. Suspension happens only in `AwaitingResponse` and holds
//! no lock.

pub mod mapping;

use crate::domain::config::TimeoutConfig;
use crate::domain::correlation::CorrelationId;
use crate::domain::envelope::RequestEnvelope;
use crate::domain::error::BridgeError;
use crate::domain::operation::Operation;
use crate::domain::validation::{validate, Params};
use crate::ipc::publisher::MessagePublisher;
use crate::ipc::registry::{CorrelationRegistry, Settlement};
use booking_telemetry::BRIDGE_REQUESTS;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, field, info_span, warn, Instrument, Span};

pub use mapping::map_response;

/// Request lifecycle phase, recorded on the request span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    Publishing,
    AwaitingResponse,
    Mapping,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validating => "validating",
            Phase::Publishing => "publishing",
            Phase::AwaitingResponse => "awaiting_response",
            Phase::Mapping => "mapping",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

/// Runs booking operations against the remote service.
///
/// Cheap to share; every call is independent.
pub struct RequestHandler {
    registry: Arc<CorrelationRegistry>,
    publisher: MessagePublisher,
    topic: String,
    timeouts: TimeoutConfig,
}

impl RequestHandler {
    pub fn new(
        registry: Arc<CorrelationRegistry>,
        publisher: MessagePublisher,
        topic: impl Into<String>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            registry,
            publisher,
            topic: topic.into(),
            timeouts,
        }
    }

    /// Execute `operation` with `params` and wait for its correlated result.
    pub async fn execute(&self, operation: Operation, params: &Params) -> Result<Value, BridgeError> {
        let span = info_span!(
            "booking_request",
            operation = %operation,
            correlation_id = field::Empty,
            phase = field::Empty,
        );

        let result = self
            .run(operation, params, &span)
            .instrument(span.clone())
            .await;

        let outcome = match &result {
            Ok(_) => {
                span.record("phase", Phase::Done.as_str());
                "ok"
            }
            Err(e) => {
                span.record("phase", Phase::Failed.as_str());
                span.in_scope(|| debug!(error = %e, status = e.status_code(), "Request failed"));
                e.outcome()
            }
        };
        BRIDGE_REQUESTS
            .with_label_values(&[operation.as_str(), outcome])
            .inc();

        result
    }

    async fn run(
        &self,
        operation: Operation,
        params: &Params,
        span: &Span,
    ) -> Result<Value, BridgeError> {
        span.record("phase", Phase::Validating.as_str());
        validate(operation, params)?;

        span.record("phase", Phase::Publishing.as_str());
        let correlation_id = CorrelationId::new();
        span.record("correlation_id", field::display(correlation_id));

        let deadline = Instant::now() + self.timeouts.for_operation(operation);
        let waiter = self.registry.register(correlation_id, deadline, operation)?;
        let envelope = RequestEnvelope::new(operation, params, correlation_id);

        if let Err(e) = self.publisher.publish(&self.topic, &envelope).await {
            self.registry.cancel(&correlation_id);
            return Err(e);
        }

        span.record("phase", Phase::AwaitingResponse.as_str());
        let response = match waiter.wait().await {
            Settlement::Response(response) => response,
            Settlement::TimedOut { waited } => {
                return Err(BridgeError::Timeout { operation, waited })
            }
            Settlement::Cancelled => {
                warn!("Waiter removed before settlement");
                return Err(BridgeError::Internal(
                    "waiter removed before settlement".to_string(),
                ));
            }
        };

        span.record("phase", Phase::Mapping.as_str());
        map_response(operation, response)
    }

    /// Slot list as served for `GetAllScheduleSlots`.
    pub async fn get_all_schedule_slots(&self, params: &Params) -> Result<Value, BridgeError> {
        self.execute(Operation::GetAllScheduleSlots, params).await
    }

    /// Currently available slots.
    pub async fn available_schedule_slots(&self, params: &Params) -> Result<Value, BridgeError> {
        self.execute(Operation::AvailableScheduleSlots, params).await
    }

    /// Bookings of one user; requires `userId`.
    pub async fn user_schedule_slots(&self, params: &Params) -> Result<Value, BridgeError> {
        self.execute(Operation::UserScheduleSlots, params).await
    }

    pub async fn all_schedule_slots(&self, params: &Params) -> Result<Value, BridgeError> {
        self.execute(Operation::AllScheduleSlots, params).await
    }

    pub async fn booked_schedule_slots(&self, params: &Params) -> Result<Value, BridgeError> {
        self.execute(Operation::BookedScheduleSlots, params).await
    }

    /// Book a slot; requires exactly `userId`, `scheduleSlotId` and
    /// `peopleQuantity`.
    pub async fn book_schedule_slot(&self, params: &Params) -> Result<Value, BridgeError> {
        self.execute(Operation::BookScheduleSlot, params).await
    }

    /// Waiters currently outstanding
    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }
}
