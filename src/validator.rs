//! Validation façade
//!
//! Runs one request through matching, body validation and parameter
//! validation, in that order, and folds the result into a single
//! [`ValidationOutcome`]. This is the only entry point HTTP layers need.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::compiler::ResolvedOperation;
use crate::matcher::find_operation;
use crate::params::validate_params;
use crate::registry::{OperationKey, Registry, RegistryHandle};
use crate::request::ApiRequest;

/// One validation error: a message and a `#`-rooted JSON pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub message: String,
    pub path: String,
}

impl Violation {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Result of validating one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Ok,
    /// No operation matches the method and path
    ResourceNotFound,
    Invalid(Violation),
    /// Several body errors from one operation
    MultipleInvalid {
        errors: Vec<Violation>,
        operation: OperationKey,
    },
}

impl ValidationOutcome {
    /// `Ok` for no violations, `Invalid` for one, `MultipleInvalid` otherwise
    pub fn from_violations(mut violations: Vec<Violation>, operation: &OperationKey) -> Self {
        match violations.len() {
            0 => ValidationOutcome::Ok,
            1 => ValidationOutcome::Invalid(violations.remove(0)),
            _ => ValidationOutcome::MultipleInvalid {
                errors: violations,
                operation: operation.clone(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ValidationOutcome::ResourceNotFound)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            ValidationOutcome::Invalid(_) | ValidationOutcome::MultipleInvalid { .. }
        )
    }

    /// The error an HTTP response reports
    pub fn first_error(&self) -> Option<&Violation> {
        match self {
            ValidationOutcome::Invalid(violation) => Some(violation),
            ValidationOutcome::MultipleInvalid { errors, .. } => errors.first(),
            _ => None,
        }
    }

    /// Every error carried by the outcome
    pub fn errors(&self) -> &[Violation] {
        match self {
            ValidationOutcome::Invalid(violation) => std::slice::from_ref(violation),
            ValidationOutcome::MultipleInvalid { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Validate a decoded body against the operation's body schema.
///
/// Operations without a body schema accept any body.
pub fn validate_body(operation: &ResolvedOperation, body: &Value) -> ValidationOutcome {
    match &operation.body {
        Some(schema) => ValidationOutcome::from_violations(schema.validate(body), &operation.key),
        None => ValidationOutcome::Ok,
    }
}

/// Validate one request against a registry snapshot
pub fn validate(registry: &Registry, request: &ApiRequest) -> ValidationOutcome {
    let Some(found) = find_operation(registry, &request.method, request.path_segments.as_slice()) else {
        tracing::debug!(method = %request.method, path = %request.path, "no matching operation");
        return ValidationOutcome::ResourceNotFound;
    };

    let operation = &found.entry.operation;
    tracing::debug!(operation = %operation.key, "matched operation");

    // A missing body is validated as an empty object so required properties
    // are still reported
    let empty = Value::Object(Map::new());
    let body = request.body.as_ref().unwrap_or(&empty);
    let outcome = validate_body(operation, body);
    if !outcome.is_ok() {
        tracing::debug!(operation = %operation.key, errors = outcome.errors().len(), "body rejected");
        return outcome;
    }

    let mut params = found.path_params;
    params.extend(request.params.clone());

    let outcome = validate_params(operation, &params);
    if !outcome.is_ok() {
        tracing::debug!(operation = %operation.key, "parameters rejected");
    }
    outcome
}

/// Validates requests against whatever registry is currently published
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    registry: RegistryHandle,
}

impl ValidationEngine {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// Engine bound to the process-wide registry
    pub fn global() -> Self {
        Self::new(crate::registry::global().clone())
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn validate(&self, request: &ApiRequest) -> ValidationOutcome {
        validate(&self.registry.snapshot(), request)
    }
}
