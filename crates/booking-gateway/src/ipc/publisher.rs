//! Outbound side: hands request envelopes to the transport.

use crate::domain::envelope::RequestEnvelope;
use crate::domain::error::BridgeError;
use shared_bus::{MessageId, Publisher};
use std::sync::Arc;
use tracing::{debug, warn};

/// Serializes request envelopes and publishes them.
///
/// A failed publish is returned as is. Retrying is the caller's call.
#[derive(Clone)]
pub struct MessagePublisher {
    transport: Arc<dyn Publisher>,
}

impl MessagePublisher {
    pub fn new(transport: Arc<dyn Publisher>) -> Self {
        Self { transport }
    }

    /// Publish `envelope` on `topic` with its operation and correlation id
    /// as message attributes.
    pub async fn publish(
        &self,
        topic: &str,
        envelope: &RequestEnvelope,
    ) -> Result<MessageId, BridgeError> {
        let payload = envelope
            .encode_payload()
            .map_err(|e| BridgeError::Internal(format!("payload encoding failed: {}", e)))?;
        let size = payload.len();

        match self
            .transport
            .publish(topic, payload, envelope.attributes())
            .await
        {
            Ok(message_id) => {
                debug!(
                    message_id = %message_id,
                    correlation_id = %envelope.correlation_id(),
                    operation = envelope.operation().wire_name(),
                    topic = topic,
                    bytes = size,
                    "Published request"
                );
                Ok(message_id)
            }
            Err(e) => {
                warn!(
                    correlation_id = %envelope.correlation_id(),
                    topic = topic,
                    error = %e,
                    "Publish failed"
                );
                Err(BridgeError::Publish(e))
            }
        }
    }
}
