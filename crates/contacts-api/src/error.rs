//! HTTP error responses.
//!
//! Every failure leaves the API as
//! `{ "status": <http status>, "errors": [{ "code", "message" }] }`.
//! The status comes from the codes carried in `errors` through a fixed table;
//! a storage or internal failure outranks anything else in the list.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use contacts_core::{Error as CoreError, ErrorCode};

/// Client-visible message for storage failures.
const STORAGE_FAILURE_MESSAGE: &str = "storage failure";

/// Client-visible message for internal defects.
pub(crate) const INTERNAL_MESSAGE: &str = "internal server error";

/// One entry of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorEntry {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error returned by handlers; renders as the JSON error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    errors: Vec<ErrorEntry>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    errors: &'a [ErrorEntry],
}

impl ApiError {
    pub fn new(errors: Vec<ErrorEntry>) -> Self {
        Self { errors }
    }

    pub fn single(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(vec![ErrorEntry::new(code, message)])
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::single(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::single(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::single(ErrorCode::Internal, message)
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.errors.iter().map(|e| e.code))
    }
}

/// HTTP status for a client-side error code, `None` for codes without a
/// dedicated mapping.
fn status_for_code(code: ErrorCode) -> Option<StatusCode> {
    match code {
        ErrorCode::NotFound => Some(StatusCode::NOT_FOUND),
        ErrorCode::BadRequest => Some(StatusCode::BAD_REQUEST),
        _ => None,
    }
}

/// Status for a list of error codes.
///
/// The first mapped code decides, except that a server failure anywhere in
/// the list wins. Without any mapped code the answer is 400.
pub fn status_for(codes: impl IntoIterator<Item = ErrorCode>) -> StatusCode {
    let mut status = None;
    for code in codes {
        if code.is_server_failure() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        if status.is_none() {
            status = status_for_code(code);
        }
    }
    status.unwrap_or(StatusCode::BAD_REQUEST)
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = err.code();
        let message = if code.is_server_failure() {
            error!(error_code = %code, error = %err, "Request failed on the server side");
            match code {
                ErrorCode::StorageFailure => STORAGE_FAILURE_MESSAGE.to_string(),
                _ => INTERNAL_MESSAGE.to_string(),
            }
        } else {
            match err {
                CoreError::BadRequest(msg) | CoreError::BadValue(msg) | CoreError::NotFound(msg) => {
                    msg
                }
                other => other.to_string(),
            }
        };
        ApiError::single(code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), errors = ?self.errors, "Request failed");
        }
        let body = ErrorBody {
            status: status.as_u16(),
            errors: &self.errors,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_code_table() {
        assert_eq!(status_for([ErrorCode::NotFound]), StatusCode::NOT_FOUND);
        assert_eq!(status_for([ErrorCode::BadRequest]), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for([ErrorCode::StorageFailure]),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for([ErrorCode::Internal]),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unmapped_code_is_bad_request() {
        assert_eq!(status_for([ErrorCode::BadValue]), StatusCode::BAD_REQUEST);
        assert_eq!(status_for([]), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_first_mapped_code_wins() {
        assert_eq!(
            status_for([ErrorCode::BadValue, ErrorCode::NotFound, ErrorCode::BadRequest]),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_server_failure_dominates() {
        assert_eq!(
            status_for([ErrorCode::NotFound, ErrorCode::StorageFailure]),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for([ErrorCode::BadRequest, ErrorCode::BadValue, ErrorCode::Internal]),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_errors_are_not_leaked() {
        let err: ApiError = CoreError::Storage("connection reset".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.errors()[0].code, ErrorCode::StorageFailure);
        assert_eq!(err.errors()[0].message, STORAGE_FAILURE_MESSAGE);
    }

    #[test]
    fn test_domain_messages_pass_through() {
        let err: ApiError = CoreError::contact_not_found("u1", "c1").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.errors()[0].message, "no contact c1 for user u1");

        let err: ApiError = CoreError::BadValue("name is required".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.errors()[0].code, ErrorCode::BadValue);
    }

    #[test]
    fn test_error_body_shape() {
        let err = ApiError::new(vec![
            ErrorEntry::new(ErrorCode::BadValue, "index \"x\" must be a non-negative integer"),
            ErrorEntry::new(ErrorCode::BadValue, "count \"y\" must be a non-negative integer"),
        ]);
        let body = ErrorBody {
            status: err.status().as_u16(),
            errors: err.errors(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["status"], 400);
        assert_eq!(value["errors"][1]["code"], "BAD_VALUE");
    }
}
