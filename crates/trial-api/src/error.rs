use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use trial_core::{ErrorClass, TrialError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Trial(#[from] TrialError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Http { status: StatusCode::BAD_REQUEST,
                     message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Http { status: StatusCode::NOT_FOUND,
                     message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Trial(err) => match err.class() {
                ErrorClass::Validation => StatusCode::BAD_REQUEST,
                ErrorClass::NotFound => StatusCode::NOT_FOUND,
                ErrorClass::Conflict => StatusCode::CONFLICT,
                ErrorClass::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // el detalle queda en el log, el cliente recibe un mensaje genérico
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trial_core::StepCode;

    #[test]
    fn trial_errors_map_to_http_status() {
        let cases = [(TrialError::Validation("x".into()), StatusCode::BAD_REQUEST),
                     (TrialError::InvalidStepCode("DPT9".into()), StatusCode::BAD_REQUEST),
                     (TrialError::InvalidVerdict("".into()), StatusCode::BAD_REQUEST),
                     (TrialError::NotFound("trial 1".into()), StatusCode::NOT_FOUND),
                     (TrialError::Conflict("dup".into()), StatusCode::CONFLICT),
                     (TrialError::OutOfSequence { step: StepCode::Dpt2,
                                                  blocking: StepCode::Dpt1 },
                      StatusCode::CONFLICT),
                     (TrialError::Storage("pool".into()), StatusCode::INTERNAL_SERVER_ERROR)];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
