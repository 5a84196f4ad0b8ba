//! Response envelope and error-to-status mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use miala_core::error::MialaError;
use serde::Serialize;
use tracing::error;

const GENERIC_ERROR: &str = "An unexpected error occurred";

/// `{responseCode, responseMessage, data, timestamp}` sent with the
/// matching HTTP status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub response_code: String,
    pub response_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(status: StatusCode, data: T) -> Self {
        Self::with_status(status, Some(data))
    }

    pub fn with_status(status: StatusCode, data: Option<T>) -> Self {
        let message = if status.is_success() { "success" } else { "error" };
        Self {
            response_code: status.as_u16().to_string(),
            response_message: message.into(),
            data,
            timestamp: Utc::now(),
            status,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Handler error. Renders as an `ApiResponse` whose data is the error
/// message.
#[derive(Debug)]
pub struct ApiError(pub MialaError);

impl From<MialaError> for ApiError {
    fn from(err: MialaError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(MialaError::Validation {
            message: rejection.body_text(),
        })
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(MialaError::Validation {
            message: rejection.body_text(),
        })
    }
}

pub fn status_for(err: &MialaError) -> StatusCode {
    match err {
        MialaError::AuthenticationFailed { .. } | MialaError::Unauthorized { .. } => {
            StatusCode::UNAUTHORIZED
        }
        MialaError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
        MialaError::AlreadyExists { .. } => StatusCode::CONFLICT,
        MialaError::BusinessRule { .. } => StatusCode::EXPECTATION_FAILED,
        MialaError::NotFound { .. } => StatusCode::NOT_FOUND,
        MialaError::Expired { .. } | MialaError::Validation { .. } => StatusCode::BAD_REQUEST,
        MialaError::Database(_)
        | MialaError::Crypto(_)
        | MialaError::EmailDelivery(_)
        | MialaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if self.0.is_internal() {
            error!(error = %self.0, "Request failed");
            GENERIC_ERROR.to_string()
        } else {
            self.0.to_string()
        };
        ApiResponse::with_status(status, Some(message)).into_response()
    }
}
