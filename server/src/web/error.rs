use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use crate::quiz::{DraftError, PayloadError, ValidationErrors};

/// Each category the front-end shows separately gets its own `kind`, so a
/// drafting failure never hides a validation problem and vice versa.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Draft(#[from] DraftError),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Payload(_) => StatusCode::BAD_REQUEST,
            WebError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WebError::Draft(DraftError::MissingMaterial) => StatusCode::BAD_REQUEST,
            WebError::Draft(DraftError::MissingApiKey) => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Draft(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            WebError::BadRequest(_) => "badRequest",
            WebError::Payload(_) => "payload",
            WebError::Validation(_) => "validation",
            WebError::Draft(_) => "draft",
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, http.status = status.as_u16(), "Request failed");
        }

        let mut body = json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "status": status.as_u16()
        });
        match &self {
            WebError::Payload(e) => {
                body["recovery"] = json!(e.recovery_route());
            }
            WebError::Validation(errors) => {
                body["issues"] = errors
                    .issues()
                    .iter()
                    .map(|issue| {
                        json!({
                            "questionNumber": issue.question_number(),
                            "message": issue.to_string(),
                        })
                    })
                    .collect();
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T, E = WebError> = std::result::Result<T, E>;
