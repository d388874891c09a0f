//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::exposure::ExposureError;
use crate::store::StoreError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("store error")]
    Store(#[from] StoreError),

    #[error("exposure failed")]
    Exposure(#[from] ExposureError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Exposure(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Exposure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Public API failures carry no payload; details only go to the log.
        let body = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "store error");
                "internal server error".to_string()
            }
            AppError::Exposure(e) => {
                if status.is_client_error() {
                    tracing::warn!(error = %e, "exposure rejected");
                } else {
                    tracing::error!(error = %e, "exposure failed");
                }
                String::new()
            }
            AppError::NotFound => String::new(),
            AppError::Forbidden => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::selector::SelectorError;

    #[test]
    fn selector_failures_are_bad_requests() {
        let err = AppError::from(ExposureError::Query {
            resource_id: 3,
            source: StoreError::Selector(SelectorError::MissingOperator {
                clause: "parent".to_string(),
            }),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_are_server_errors() {
        let err = AppError::from(ExposureError::Query {
            resource_id: 3,
            source: StoreError::Conflict("boom".to_string()),
        });
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
