use api_shared::ErrorRes;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hms_core::HmsError;

/// Error returned by every handler. Renders as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    Core(HmsError),
    /// Failure outside the core, such as a blocking task that panicked.
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Core(HmsError::InvalidInput(_) | HmsError::AlreadyBooked) => {
                StatusCode::BAD_REQUEST
            }
            Self::Core(HmsError::Unauthenticated(_)) => StatusCode::UNAUTHORIZED,
            Self::Core(HmsError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Core(HmsError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(HmsError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Core(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HmsError> for ApiError {
    fn from(err: HmsError) -> Self {
        Self::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Core(HmsError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Core(err) if status != StatusCode::INTERNAL_SERVER_ERROR => err.to_string(),
            err => {
                tracing::error!(error = ?err, "request failed");
                "Server error".to_string()
            }
        };
        (status, Json(ErrorRes { error: message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_booking_stays_a_bad_request() {
        assert_eq!(
            ApiError::from(HmsError::AlreadyBooked).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(HmsError::Conflict("User already exists".into())).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn storage_failures_hide_their_detail() {
        let err = ApiError::from(HmsError::LockPoisoned);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_errors_are_server_errors() {
        let err = ApiError::internal(anyhow::anyhow!("task join error"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
