//! Error handling for the form server
//!
//! Every error leaves the server as a FHIR OperationOutcome with a matching HTTP status.

use atrius_form_schema::FormSchemaError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// Server-specific error type that can be converted to HTTP responses
#[derive(Debug)]
pub enum ServerError {
    /// Requested form not found
    NotFound(String),

    /// Loading or compiling the data directory failed
    LoadError(FormSchemaError),

    /// Generic internal server error
    InternalError(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServerError::LoadError(err) => write!(f, "Load error: {}", err),
            ServerError::InternalError(msg) => write!(f, "Internal server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<FormSchemaError> for ServerError {
    fn from(err: FormSchemaError) -> Self {
        ServerError::LoadError(err)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, "not-found", msg.clone()),
            ServerError::LoadError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "processing",
                err.to_string(),
            ),
            ServerError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "exception", msg.clone())
            }
        };

        let operation_outcome = create_operation_outcome(error_code, &details);

        (status, Json(operation_outcome)).into_response()
    }
}

/// Create a FHIR R4 OperationOutcome for error responses
fn create_operation_outcome(code: &str, details: &str) -> serde_json::Value {
    serde_json::json!({
        "resourceType": "OperationOutcome",
        "issue": [{
            "severity": "error",
            "code": code,
            "details": {
                "text": details
            }
        }]
    })
}

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;
