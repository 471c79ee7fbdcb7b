//! Error types for the intake ingress.
//!
//! Every terminal failure maps to one of three generic HTTP responses. The
//! variants carry enough detail for server-side diagnostics, but nothing here
//! is ever echoed to the caller.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use snafu::prelude::*;

use landing_core::metrics::events::RequestOutcome;

// Re-export common errors
pub use landing_core::error::{ConfigError, StorageError};

/// Response body for an accepted write.
pub const ACCEPTED_BODY: &str = "Accepted.";
const FORBIDDEN_BODY: &str = "Forbidden.";
const BAD_REQUEST_BODY: &str = "Bad request.";
const SERVER_ERROR_BODY: &str = "Server error.";

/// The validation rule a rejected request violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFault {
    /// Body could not be read, or exceeds the size limit.
    UnreadableBody,
    /// Body is not valid JSON.
    MalformedBody,
    /// Body is valid JSON but not an object.
    NotAnObject,
    /// `filename` is missing, not a string, or blank.
    InvalidFilename,
    /// `upload_type` is missing or not a recognized category.
    InvalidUploadType,
    /// `table` is missing or not a configured area.
    UnknownTable,
}

impl ValidationFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFault::UnreadableBody => "unreadable_body",
            ValidationFault::MalformedBody => "malformed_body",
            ValidationFault::NotAnObject => "not_an_object",
            ValidationFault::InvalidFilename => "invalid_filename",
            ValidationFault::InvalidUploadType => "invalid_upload_type",
            ValidationFault::UnknownTable => "unknown_table",
        }
    }
}

impl fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failures of an ingest request.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IngestError {
    /// Caller does not hold the required role.
    #[snafu(display("Caller lacks the required role"))]
    Forbidden,

    /// Request body failed validation.
    #[snafu(display("Invalid ingest request: {fault}"))]
    InvalidRequest { fault: ValidationFault },

    /// Failed to serialize the normalized payload.
    #[snafu(display("Failed to serialize payload: {source}"))]
    Serialize { source: serde_json::Error },

    /// The storage write failed.
    #[snafu(display("Failed to write payload: {source}"))]
    Storage { source: StorageError },
}

impl IngestError {
    /// Short, content-free marker suitable for server-side logs.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Forbidden => "forbidden",
            IngestError::InvalidRequest { fault } => fault.as_str(),
            IngestError::Serialize { .. } => "serialize",
            IngestError::Storage { .. } => "storage",
        }
    }

    pub fn outcome(&self) -> RequestOutcome {
        match self {
            IngestError::Forbidden => RequestOutcome::Forbidden,
            IngestError::InvalidRequest { .. } => RequestOutcome::BadRequest,
            IngestError::Serialize { .. } | IngestError::Storage { .. } => {
                RequestOutcome::ServerError
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        status_for(self.outcome())
    }
}

/// HTTP status for a request outcome.
pub fn status_for(outcome: RequestOutcome) -> StatusCode {
    match outcome {
        RequestOutcome::Accepted => StatusCode::OK,
        RequestOutcome::Forbidden => StatusCode::FORBIDDEN,
        RequestOutcome::BadRequest => StatusCode::BAD_REQUEST,
        RequestOutcome::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body_for(outcome: RequestOutcome) -> &'static str {
    match outcome {
        RequestOutcome::Accepted => ACCEPTED_BODY,
        RequestOutcome::Forbidden => FORBIDDEN_BODY,
        RequestOutcome::BadRequest => BAD_REQUEST_BODY,
        RequestOutcome::ServerError => SERVER_ERROR_BODY,
    }
}

/// Build the generic response for an outcome.
pub fn outcome_response(outcome: RequestOutcome) -> Response {
    (status_for(outcome), body_for(outcome)).into_response()
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        outcome_response(self.outcome())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(IngestError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            IngestError::InvalidRequest {
                fault: ValidationFault::UnknownTable
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        let storage = IngestError::Storage {
            source: StorageError::InvalidUrl {
                url: "x".to_string(),
            },
        };
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.kind(), "storage");
    }

    #[test]
    fn test_validation_faults_share_one_response() {
        let faults = [
            ValidationFault::UnreadableBody,
            ValidationFault::MalformedBody,
            ValidationFault::NotAnObject,
            ValidationFault::InvalidFilename,
            ValidationFault::InvalidUploadType,
            ValidationFault::UnknownTable,
        ];
        for fault in faults {
            let err = IngestError::InvalidRequest { fault };
            assert_eq!(err.outcome(), RequestOutcome::BadRequest);
        }
    }
}
