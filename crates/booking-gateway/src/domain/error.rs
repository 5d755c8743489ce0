//! Error taxonomy of the bridge.
//!
//! Layer errors (`ValidationError`, `RegistryError`, `EnvelopeError`,
//! `ConfigError`) fold into [`BridgeError`], the only error a caller sees.
//! Every `BridgeError` has an outward status code and a JSON body.

use crate::domain::correlation::CorrelationId;
use crate::domain::operation::Operation;
use serde::Serialize;
use serde_json::Value;
use shared_bus::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Outward status codes
pub mod status {
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    pub const SERVICE_UNAVAILABLE: u16 = 503;
    pub const GATEWAY_TIMEOUT: u16 = 504;
}

/// Parameter set rejected before anything reaches the bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("params missing")]
    ParamsMissing,

    #[error("missing: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("unexpected: {}", .0.join(", "))]
    Unexpected(Vec<String>),

    #[error("empty value: {0}")]
    EmptyValue(String),
}

/// Correlation registry failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("correlation id {0} is already registered")]
    Duplicate(CorrelationId),

    #[error("registry is closed to new waiters")]
    ShuttingDown,
}

/// Inbound payload could not be decoded
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed response payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Configuration could not be loaded or is unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Env { key: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Error returned to the caller of a booking operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("publish failed: {0}")]
    Publish(#[from] TransportError),

    #[error("no response for {operation} within {}", humantime::format_duration(*waited))]
    Timeout {
        operation: Operation,
        waited: Duration,
    },

    #[error("not found: {reason}")]
    NotFound {
        reason: String,
        detail: Option<Value>,
    },

    #[error("rejected by booking service ({status})")]
    Domain { status: u16, detail: Value },

    #[error("subscribe failed: {0}")]
    Subscribe(TransportError),

    #[error("bridge is shutting down")]
    ShuttingDown,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for BridgeError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ShuttingDown => BridgeError::ShuttingDown,
            RegistryError::Duplicate(_) => BridgeError::Internal(err.to_string()),
        }
    }
}

/// JSON error body handed to the front end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl BridgeError {
    pub fn not_found(reason: impl Into<String>) -> Self {
        BridgeError::NotFound {
            reason: reason.into(),
            detail: None,
        }
    }

    /// Outward status code
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::Validation(_) => status::BAD_REQUEST,
            BridgeError::Publish(_) => status::INTERNAL_SERVER_ERROR,
            BridgeError::Timeout { .. } => status::GATEWAY_TIMEOUT,
            BridgeError::NotFound { .. } => status::NOT_FOUND,
            BridgeError::Domain { status, .. } if (400..500).contains(status) => *status,
            BridgeError::Domain { .. } => status::BAD_REQUEST,
            BridgeError::ShuttingDown => status::SERVICE_UNAVAILABLE,
            BridgeError::Subscribe(_) | BridgeError::Internal(_) => status::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label for this failure
    pub fn outcome(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "validation",
            BridgeError::Publish(_) => "publish",
            BridgeError::Timeout { .. } => "timeout",
            BridgeError::NotFound { .. } => "not_found",
            BridgeError::Domain { .. } => "domain",
            BridgeError::ShuttingDown => "unavailable",
            BridgeError::Subscribe(_) | BridgeError::Internal(_) => "internal",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let detail = match self {
            BridgeError::NotFound { detail, .. } => detail.clone(),
            BridgeError::Domain { detail, .. } => Some(detail.clone()),
            _ => None,
        };
        ErrorBody {
            status: self.status_code(),
            error: self.to_string(),
            detail,
        }
    }
}
