//! Converts [`usermgr_core::OrchestratorError`] into an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use usermgr_core::OrchestratorError;

/// Wraps an [`OrchestratorError`] so it can be returned directly from an
/// axum handler.
pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::warn!(kind = self.0.kind.as_str(), detail = %self.0.detail, "handler error");
        (status, Json(self.0.kind.to_body())).into_response()
    }
}
