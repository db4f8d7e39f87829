//! Axum route handlers for the Candidates API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::candidates::validation::CreateCandidateRequest;
use crate::errors::AppError;
use crate::generation::pipeline::create_with_cv;
use crate::models::candidate::{CandidateDetail, CandidateListItem};
use crate::models::ApiResponse;
use crate::state::AppState;
use crate::store::{PageQuery, Paginated};

/// POST /api/candidates
///
/// Direct input. Unlike generated profiles, a taken email is a 409: the
/// caller chose it, so it is not disambiguated.
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    Json(request): Json<CreateCandidateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CandidateDetail>>), AppError> {
    let profile = request.into_profile()?;

    if state.store.find_by_email(&profile.email).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "A candidate with email {} already exists",
            profile.email
        )));
    }

    let (candidate, _cv) =
        create_with_cv(state.store.as_ref(), state.classifier.as_ref(), &profile).await?;
    info!(candidate_id = %candidate.id, "Created candidate from direct input");

    let detail = state
        .store
        .get_candidate(candidate.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {} not found", candidate.id)))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(detail))))
}

/// GET /api/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<CandidateListItem>>, AppError> {
    let page = state.store.list_candidates(query.params()?).await?;
    Ok(Json(page))
}

/// GET /api/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CandidateDetail>>, AppError> {
    let detail = state
        .store
        .get_candidate(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {id} not found")))?;
    Ok(Json(ApiResponse::new(detail)))
}

/// DELETE /api/candidates/:id
///
/// Cascades to skill links, CVs and rankings.
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_candidate(id).await? {
        return Err(AppError::NotFound(format!("Candidate {id} not found")));
    }
    info!(candidate_id = %id, "Deleted candidate and all related data");
    Ok(StatusCode::NO_CONTENT)
}
