//! Error responses for the REST surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use campaign_core::{CampaignError, ErrorCode, ValidationIssue};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
}

/// Handler error wrapping the domain error.
#[derive(Debug)]
pub struct ApiError(pub CampaignError);

impl From<CampaignError> for ApiError {
    fn from(err: CampaignError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CampaignError::Validation(_) | CampaignError::UnknownPlatform(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CampaignError::InvalidState(_) => StatusCode::CONFLICT,
            CampaignError::NotFound(_) => StatusCode::NOT_FOUND,
            CampaignError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CampaignError::System(_) => StatusCode::BAD_GATEWAY,
            CampaignError::Config(_) | CampaignError::Serialization(_) | CampaignError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, status = status.as_u16(), "Request failed");
            metrics::counter!("api.errors").increment(1);
        } else {
            metrics::counter!("api.rejections", "code" => self.0.code().as_str()).increment(1);
        }
        // Internal details stay in the logs.
        let message = match &self.0 {
            CampaignError::Config(_) | CampaignError::Serialization(_) | CampaignError::Internal(_) => {
                "Internal processing error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error: self.0.code(),
            issues: self.0.issues().to_vec(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
