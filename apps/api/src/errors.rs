use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many requests: {0}")]
    RateLimited(String),

    /// No population to rank. Raised before any mutation.
    #[error("No candidates found in the system")]
    NoCandidates,

    /// Transport or parse failure talking to the classifier. The previous
    /// ranking epoch is left intact.
    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Could not derive a unique email from '{email}' after {attempts} attempts")]
    IdentityCollisionExhausted { email: String, attempts: u32 },

    /// A generation batch failed partway. Candidates already written by the
    /// batch have been removed again.
    #[error("Batch generation failed after {completed} of {requested} candidates: {cause}")]
    PartialBatch {
        completed: usize,
        requested: usize,
        cause: Box<AppError>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AppError::NoCandidates => (StatusCode::NOT_FOUND, "NO_CANDIDATES"),
            AppError::Classifier(_) => (StatusCode::BAD_GATEWAY, "CLASSIFIER_ERROR"),
            AppError::IdentityCollisionExhausted { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IDENTITY_COLLISION_EXHAUSTED",
            ),
            AppError::PartialBatch { .. } => (StatusCode::BAD_GATEWAY, "PARTIAL_BATCH"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::RateLimited(msg) => msg.clone(),
            AppError::Unauthorized => "Invalid or missing API key".to_string(),
            AppError::NoCandidates => self.to_string(),
            AppError::Classifier(msg) => {
                tracing::error!("Classifier error: {msg}");
                "The AI service failed to respond. Previous results are unchanged.".to_string()
            }
            AppError::IdentityCollisionExhausted { .. } => {
                tracing::error!("{self}");
                "Could not allocate a unique candidate email".to_string()
            }
            AppError::PartialBatch {
                completed,
                requested,
                cause,
            } => {
                tracing::error!("Partial batch ({completed}/{requested}): {cause}");
                format!(
                    "Candidate generation failed after {completed} of {requested} candidates; \
                    no candidates from this batch were kept"
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_candidates_maps_to_404() {
        let response = AppError::NoCandidates.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_classifier_error_maps_to_bad_gateway() {
        let response = AppError::Classifier("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_partial_batch_message_names_counts() {
        let err = AppError::PartialBatch {
            completed: 2,
            requested: 5,
            cause: Box::new(AppError::Classifier("boom".to_string())),
        };
        let text = err.to_string();
        assert!(text.contains("2 of 5"), "{text}");
        assert!(text.contains("boom"), "{text}");
    }

    #[test]
    fn test_rate_limited_maps_to_429() {
        let response = AppError::RateLimited("slow down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
