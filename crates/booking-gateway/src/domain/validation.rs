//! Request validation.
//!
//! Checks a parameter set against the operation's declared contract. Pure:
//! nothing is published and no waiter is registered for a rejected request.
//!
//! Checks run in this order and the first failure wins:
//! 1. parameters required but none given → `params missing`
//! 2. required names absent → `missing: <names>` (contract order)
//! 3. names outside the contract → `unexpected: <names>` (sorted)
//! 4. a required value that is empty or whitespace → `empty value: <name>`

use crate::domain::error::ValidationError;
use crate::domain::operation::Operation;
use std::collections::BTreeMap;

/// Parameters of one call, as received from the front end.
pub type Params = BTreeMap<String, String>;

/// Validate `params` against the contract of `operation`.
pub fn validate(operation: Operation, params: &Params) -> Result<(), ValidationError> {
    let required = operation.required_params();

    if params.is_empty() {
        return if required.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ParamsMissing)
        };
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|name| !params.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::Missing(missing));
    }

    let unexpected: Vec<String> = params
        .keys()
        .filter(|key| !required.contains(&key.as_str()))
        .cloned()
        .collect();
    if !unexpected.is_empty() {
        return Err(ValidationError::Unexpected(unexpected));
    }

    for name in required {
        let blank = params
            .get(*name)
            .map(|value| value.trim().is_empty())
            .unwrap_or(true);
        if blank {
            return Err(ValidationError::EmptyValue(name.to_string()));
        }
    }

    Ok(())
}
