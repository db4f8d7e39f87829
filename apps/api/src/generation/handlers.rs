//! Axum route handlers for the Generation API.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::generation::pipeline::{BatchGenerationResult, GenerationPipeline};
use crate::models::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub count: u32,
}

/// POST /api/candidates/generate
///
/// Invents `count` candidates (1-10) with one CV each. The whole batch is
/// kept or none of it is.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BatchGenerationResult>>), AppError> {
    let result = GenerationPipeline::new(state.store.as_ref(), state.classifier.as_ref())
        .generate(request.count)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(result))))
}
