//! Response listener: the one consumer of the shared inbound subscription.
//!
//! Every inbound message is acknowledged whatever happens to it. Redelivery is
//! never used to retry at the application level. A message without a usable
//! correlation id or with an undecodable body is logged and dropped; the
//! waiter it was meant for (if any) runs into its deadline instead of
//! receiving corrupt data.

use crate::domain::correlation::CorrelationId;
use crate::domain::envelope::ResponseEnvelope;
use crate::ipc::registry::CorrelationRegistry;
use booking_telemetry::INBOUND_MESSAGES;
use futures::StreamExt;
use shared_bus::{MessageStream, ReceivedMessage, ATTR_CORRELATION_ID};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What the listener did with one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handed to a waiting caller
    Resolved,
    /// Well formed, but nobody was waiting for it
    Unmatched,
    /// Body could not be decoded
    Malformed,
    /// Correlation id attribute missing or unparsable
    Uncorrelated,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Resolved => "resolved",
            Disposition::Unmatched => "unmatched",
            Disposition::Malformed => "malformed",
            Disposition::Uncorrelated => "uncorrelated",
        }
    }
}

/// Drains the inbound subscription into the correlation registry.
pub struct ResponseListener {
    registry: Arc<CorrelationRegistry>,
    stream: MessageStream,
}

impl ResponseListener {
    pub fn new(registry: Arc<CorrelationRegistry>, stream: MessageStream) -> Self {
        Self { registry, stream }
    }

    /// Run until the stream ends or `shutdown` flips to true.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Response listener started");

        loop {
            tokio::select! {
                next = self.stream.next() => match next {
                    Some(Ok(message)) => {
                        self.handle(message);
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Error receiving from inbound subscription");
                    }
                    None => {
                        warn!("Inbound subscription closed, stopping listener");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Response listener stopped");
    }

    /// Dispatch one message and acknowledge it.
    pub fn handle(&self, message: ReceivedMessage) -> Disposition {
        let disposition = self.dispatch(&message);
        INBOUND_MESSAGES
            .with_label_values(&[disposition.as_str()])
            .inc();
        message.ack();
        disposition
    }

    fn dispatch(&self, message: &ReceivedMessage) -> Disposition {
        let Some(raw_id) = message.attribute(ATTR_CORRELATION_ID) else {
            warn!(message_id = %message.id(), "Inbound message without correlation id");
            return Disposition::Uncorrelated;
        };

        let correlation_id = match CorrelationId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    message_id = %message.id(),
                    correlation_id = raw_id,
                    error = %e,
                    "Inbound message with invalid correlation id"
                );
                return Disposition::Uncorrelated;
            }
        };

        let response = match ResponseEnvelope::decode(correlation_id, message.payload()) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    message_id = %message.id(),
                    correlation_id = %correlation_id,
                    error = %e,
                    "Dropping malformed response"
                );
                return Disposition::Malformed;
            }
        };

        debug!(
            message_id = %message.id(),
            correlation_id = %correlation_id,
            attempt = message.delivery_attempt(),
            "Dispatching response"
        );

        if self.registry.resolve(response) {
            Disposition::Resolved
        } else {
            Disposition::Unmatched
        }
    }
}
