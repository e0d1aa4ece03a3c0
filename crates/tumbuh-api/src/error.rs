use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tumbuh_core::error::TumbuhError;

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into(), details: None }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into(), details: None }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self { status: StatusCode::CONFLICT, message: message.into(), details: None }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self { status: StatusCode::SERVICE_UNAVAILABLE, message: message.into(), details: None }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.message, details: self.details };
        (self.status, Json(body)).into_response()
    }
}

impl From<TumbuhError> for ApiError {
    fn from(err: TumbuhError) -> Self {
        let details = err.to_string();
        match &err {
            TumbuhError::Validation { .. } => Self::bad_request("Invalid request"),
            TumbuhError::AreaNotFound { .. } => Self::not_found("Area not found"),
            TumbuhError::AreaBusy { .. }
            | TumbuhError::AreaNotReady { .. }
            | TumbuhError::InvalidTransition { .. } => Self::conflict("Area is not in a usable state"),
            TumbuhError::ProviderUnavailable { .. } => Self::unavailable("Provider unavailable"),
            _ => {
                tracing::error!(error = %err, "Request failed");
                Self::internal("Internal error")
            }
        }
        .with_details(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumbuh_core::models::{AreaId, AreaStatus};

    #[test]
    fn test_error_status_mapping() {
        let id = AreaId::new();
        let cases = [
            (TumbuhError::validation("geometry", "empty"), StatusCode::BAD_REQUEST),
            (TumbuhError::AreaNotFound { id }, StatusCode::NOT_FOUND),
            (
                TumbuhError::AreaNotReady { id, status: AreaStatus::Collecting },
                StatusCode::CONFLICT,
            ),
            (TumbuhError::Storage("pool timed out".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, expected);
            assert!(api.details.is_some());
        }
    }
}
