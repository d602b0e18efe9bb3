//! # Request Validation Middleware
//!
//! Axum middleware that runs every request through the validation façade
//! before it reaches a handler.
//!
//! ```ignore
//! let layer = ValidationLayer::new(registry::global().clone());
//! let app = Router::new()
//!     .route("/api/pets", post(create_pet))
//!     .layer(axum::middleware::from_fn_with_state(layer, validate_request));
//! ```
//!
//! Requests carrying the [`AlreadyValidated`] extension pass through
//! untouched. Failures are rendered as
//! `{"error": {"path": ..., "message": ...}}`.

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::matcher::find_operation;
use crate::registry::RegistryHandle;
use crate::request::ApiRequest;
use crate::validator::{ValidationOutcome, validate};

pub const NOT_FOUND_MESSAGE: &str = "API does not provide resource";
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Request extension marking a request as already validated upstream
#[derive(Debug, Clone, Copy, Default)]
pub struct AlreadyValidated;

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub path: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                path: path.into(),
                message: message.into(),
            },
        }
    }
}

/// Middleware state: where to find the registry and how to answer failures
#[derive(Debug, Clone)]
pub struct ValidationLayer {
    registry: RegistryHandle,
    failure_status: StatusCode,
    body_limit: usize,
}

impl ValidationLayer {
    pub fn new(registry: RegistryHandle) -> Self {
        Self {
            registry,
            failure_status: StatusCode::BAD_REQUEST,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Layer configured from the `[middleware]` section
    pub fn from_config(registry: RegistryHandle, config: &Config) -> Self {
        let status = StatusCode::from_u16(config.middleware.failure_status)
            .unwrap_or(StatusCode::BAD_REQUEST);
        Self::new(registry)
            .with_failure_status(status)
            .with_body_limit(config.middleware.body_limit_bytes)
    }

    pub fn with_failure_status(mut self, status: StatusCode) -> Self {
        self.failure_status = status;
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

/// Validate the request and either forward it or answer with an error.
///
/// The operation is matched before the body is read, so unknown resources
/// are always 404 and only operations with a body schema buffer the body.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn validate_request(
    State(layer): State<ValidationLayer>,
    request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<AlreadyValidated>().is_some() {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| request.uri().path());
    let mut api_request = ApiRequest::new(request.method().as_str(), target);
    let registry = layer.registry.snapshot();

    let expects_body = match find_operation(
        &registry,
        &api_request.method,
        api_request.path_segments.as_slice(),
    ) {
        Some(found) => found.entry.operation.body.is_some(),
        None => {
            tracing::debug!(path = %api_request.path, "no matching operation");
            return error_response(StatusCode::NOT_FOUND, &api_request.path, NOT_FOUND_MESSAGE);
        }
    };

    let request = if expects_body {
        let (parts, body) = request.into_parts();
        let bytes = match to_bytes(body, layer.body_limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), error = %e, "request body rejected");
                return error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    parts.uri.path(),
                    "Request body too large",
                );
            }
        };

        if !bytes.is_empty() && is_json(&parts.headers) {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => api_request = api_request.with_body(value),
                Err(e) => {
                    tracing::warn!(path = %parts.uri.path(), error = %e, "malformed JSON body");
                    return error_response(
                        layer.failure_status,
                        "#",
                        "Request body is not valid JSON",
                    );
                }
            }
        }
        Request::from_parts(parts, Body::from(bytes))
    } else {
        request
    };

    match validate(&registry, &api_request) {
        ValidationOutcome::Ok => {
            let mut request = request;
            request.extensions_mut().insert(AlreadyValidated);
            next.run(request).await
        }
        ValidationOutcome::ResourceNotFound => {
            error_response(StatusCode::NOT_FOUND, &api_request.path, NOT_FOUND_MESSAGE)
        }
        failed => match failed.first_error() {
            Some(violation) => {
                error_response(layer.failure_status, &violation.path, &violation.message)
            }
            None => error_response(layer.failure_status, "#", "Request is invalid"),
        },
    }
}

/// JSON unless a non-JSON content type is declared
fn is_json(headers: &axum::http::HeaderMap) -> bool {
    match headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    {
        Some(content_type) => {
            let essence = content_type.split(';').next().unwrap_or("").trim();
            essence == "application/json" || essence.ends_with("+json")
        }
        None => true,
    }
}

fn error_response(status: StatusCode, path: &str, message: &str) -> Response {
    (status, Json(ErrorBody::new(path, message))).into_response()
}
