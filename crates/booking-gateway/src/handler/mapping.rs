//! Response mapping: correlated response envelope to outward result.

use crate::domain::envelope::ResponseEnvelope;
use crate::domain::error::{status, BridgeError};
use crate::domain::operation::{Operation, ResponseMapping};
use serde_json::Value;

/// Translate `response` according to the mapping declared for `operation`.
pub fn map_response(operation: Operation, response: ResponseEnvelope) -> Result<Value, BridgeError> {
    match operation.mapping() {
        ResponseMapping::PassThrough => Ok(response.into_payload()),

        ResponseMapping::RequireNonEmpty => {
            if response.is_empty() {
                Err(BridgeError::not_found("no reservations"))
            } else {
                Ok(response.into_payload())
            }
        }

        ResponseMapping::UnwrapResult => Ok(response.inner_result()),

        ResponseMapping::NotFoundOrUnwrap => {
            if response.domain_status == Some(status::NOT_FOUND) {
                Err(BridgeError::NotFound {
                    reason: "no booked slots".to_string(),
                    detail: Some(response.into_payload()),
                })
            } else {
                Ok(response.inner_result())
            }
        }

        ResponseMapping::DomainErrorOrUnwrap => match response.domain_status {
            Some(status::BAD_REQUEST) => Err(BridgeError::Domain {
                status: status::BAD_REQUEST,
                detail: response.error_detail(),
            }),
            _ => Ok(response.inner_result()),
        },
    }
}
