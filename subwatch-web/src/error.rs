//! HTTP mapping of `CoreError`

use std::fmt;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use subwatch_core::error::CoreError;

/// Handler error; wraps `CoreError` so it can implement `ResponseError`.
#[derive(Debug)]
pub struct AppError(pub CoreError);

pub type ApiResult<T> = Result<T, AppError>;

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
            CoreError::TargetNotFound(_) | CoreError::SubdomainNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            CoreError::ScanInProgress { .. }
            | CoreError::NoScanOutstanding(_)
            | CoreError::TargetNameTaken(_) => StatusCode::CONFLICT,
            CoreError::StorageError(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::SerializationError(_) | CoreError::NotificationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.0.is_expected() {
            log::warn!("{}", self.0);
        } else {
            log::error!("{}", self.0);
        }

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.0,
        }))
    }
}

/// Malformed JSON bodies become validation errors in the common envelope.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError(CoreError::ValidationError(format!("Invalid JSON body: {err}"))).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError(CoreError::ValidationError(format!("Invalid query string: {err}"))).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError(CoreError::ValidationError(format!("Invalid path: {err}"))).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use subwatch_core::types::ScanStatus;

    #[test]
    fn maps_core_errors_to_status_codes() {
        let cases = [
            (CoreError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::TargetNotFound(1), StatusCode::NOT_FOUND),
            (
                CoreError::SubdomainNotFound {
                    target_id: 1,
                    subdomain_id: 2,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                CoreError::ScanInProgress {
                    target_id: 1,
                    status: ScanStatus::Queued,
                },
                StatusCode::CONFLICT,
            ),
            (CoreError::NoScanOutstanding(1), StatusCode::CONFLICT),
            (CoreError::TargetNameTaken("a".into()), StatusCode::CONFLICT),
            (
                CoreError::StorageError("locked".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CoreError::NotificationError("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError(err).status_code(), status);
        }
    }
}
