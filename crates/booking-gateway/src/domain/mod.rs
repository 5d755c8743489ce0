//! Domain types for the booking bridge.
//!
//! Operations and their contracts, validation, envelopes, configuration and
//! the error taxonomy. Nothing in here touches the transport or the runtime.

pub mod config;
pub mod correlation;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod validation;

pub use config::{GatewayConfig, TimeoutConfig, TransportConfig};
pub use correlation::CorrelationId;
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use error::{
    BridgeError, ConfigError, EnvelopeError, ErrorBody, RegistryError, ValidationError,
};
pub use operation::{Operation, OperationInfo, ResponseMapping};
pub use validation::{validate, Params};
