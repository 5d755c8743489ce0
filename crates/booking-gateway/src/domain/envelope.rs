//! Request and response envelopes.
//!
//! The outbound message body is the JSON object of the call parameters (empty
//! for parameterless operations). Operation and correlation id travel as
//! transport attributes. Responses carry the correlation id in the same
//! attribute and a JSON body that may embed a `status`, a `message` holding
//! the actual result, and an `error` detail.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::EnvelopeError;
use crate::domain::operation::Operation;
use crate::domain::validation::Params;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use shared_bus::{Attributes, ATTR_CORRELATION_ID, ATTR_OPERATION};

/// Field of the response body holding the result
pub const RESULT_FIELD: &str = "message";
/// Field of the response body holding a rejection detail
pub const ERROR_FIELD: &str = "error";
/// Field of the response body holding the embedded status
pub const STATUS_FIELD: &str = "status";

/// Outbound request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    operation: Operation,
    payload: Option<Value>,
    correlation_id: CorrelationId,
    created_at: DateTime<Utc>,
}

impl RequestEnvelope {
    /// Build the envelope for an already validated parameter set.
    pub fn new(operation: Operation, params: &Params, correlation_id: CorrelationId) -> Self {
        let payload = if params.is_empty() {
            None
        } else {
            let object: Map<String, Value> = params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            Some(Value::Object(object))
        };

        Self {
            operation,
            payload,
            correlation_id,
            created_at: Utc::now(),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Message body; empty when there is no payload.
    pub fn encode_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        match &self.payload {
            Some(value) => serde_json::to_vec(value),
            None => Ok(Vec::new()),
        }
    }

    /// Transport attributes: wire operation name and correlation id.
    pub fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::with_capacity(2);
        attributes.insert(
            ATTR_OPERATION.to_string(),
            self.operation.wire_name().to_string(),
        );
        attributes.insert(
            ATTR_CORRELATION_ID.to_string(),
            self.correlation_id.to_string(),
        );
        attributes
    }
}

/// Inbound response, consumed by exactly one waiter.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub correlation_id: CorrelationId,
    pub payload: Option<Value>,
    pub domain_status: Option<u16>,
}

impl ResponseEnvelope {
    pub fn new(correlation_id: CorrelationId, payload: Option<Value>) -> Self {
        let domain_status = payload
            .as_ref()
            .and_then(|p| p.get(STATUS_FIELD))
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok());

        Self {
            correlation_id,
            payload,
            domain_status,
        }
    }

    /// Decode a message body. A blank body is an absent payload.
    pub fn decode(correlation_id: CorrelationId, body: &[u8]) -> Result<Self, EnvelopeError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new(correlation_id, None));
        }
        let payload: Value = serde_json::from_slice(body)?;
        Ok(Self::new(correlation_id, Some(payload)))
    }

    /// Absent, null, blank string, empty array or empty object.
    pub fn is_empty(&self) -> bool {
        match &self.payload {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(Value::Object(fields)) => fields.is_empty(),
            Some(_) => false,
        }
    }

    /// Inner result field, `null` when the body has none.
    pub fn inner_result(&self) -> Value {
        self.field(RESULT_FIELD)
    }

    /// Embedded rejection detail, `null` when the body has none.
    pub fn error_detail(&self) -> Value {
        self.field(ERROR_FIELD)
    }

    /// Whole payload, `null` when absent.
    pub fn into_payload(self) -> Value {
        self.payload.unwrap_or(Value::Null)
    }

    fn field(&self, name: &str) -> Value {
        self.payload
            .as_ref()
            .and_then(|p| p.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}
