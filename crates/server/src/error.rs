use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::mediator::{DispatchError, Failure, FailureKind};
use thiserror::Error;
use utils::response::ApiResponse;

/// Body text for every 5xx. Details only go to the log.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Expected business outcome, mapped to a 4xx by its kind.
    #[error("{0}")]
    Failure(Failure),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<Failure> for ApiError {
    fn from(failure: Failure) -> Self {
        ApiError::Failure(failure)
    }
}

pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Validation | FailureKind::DomainRule => StatusCode::BAD_REQUEST,
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Conflict => StatusCode::CONFLICT,
    }
}

/// Generic 500 with the shared envelope.
pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error(INTERNAL_ERROR_MESSAGE)),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Failure(failure) => {
                let status = status_for(failure.kind);
                tracing::debug!(%status, kind = %failure.kind, "Request failed: {}", failure.message);
                let body = ApiResponse::<Vec<String>>::error_with_data(
                    &failure.message,
                    failure.field_errors,
                );
                (status, Json(body)).into_response()
            }
            ApiError::Dispatch(error) => {
                tracing::error!(error = ?error, "Unhandled error: {}", error);
                internal_error_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kinds_map_to_client_errors() {
        assert_eq!(status_for(FailureKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(FailureKind::DomainRule), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(FailureKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(FailureKind::Conflict), StatusCode::CONFLICT);
    }

    #[test]
    fn dispatch_errors_become_500() {
        let response = ApiError::from(DispatchError::NoHandler("Ping")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::from(Failure::not_found("Customer", 1)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
