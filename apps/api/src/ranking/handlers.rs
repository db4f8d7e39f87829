//! Axum route handlers for the Ranking API.

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::ranking::{InterviewSplit, RankingWithCandidate};
use crate::models::ApiResponse;
use crate::ranking::reconciler::RankingReconciler;
use crate::ranking::verdict::split_by_interview;
use crate::ranking::MAX_CRITERIA_LEN;
use crate::state::AppState;
use crate::store::{PageQuery, Paginated};

#[derive(Debug, Default, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub criteria: Option<String>,
}

impl RankRequest {
    /// An empty body means the default criteria. Anything else must be a
    /// well-formed request, since a run replaces the current epoch.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;

        if let Some(criteria) = &request.criteria {
            if criteria.chars().count() > MAX_CRITERIA_LEN {
                return Err(AppError::Validation(format!(
                    "criteria must be at most {MAX_CRITERIA_LEN} characters"
                )));
            }
        }
        Ok(request)
    }
}

/// POST /api/rankings
///
/// Ranks every stored candidate and replaces the current epoch. A missing
/// body ranks against the default criteria.
pub async fn handle_rank_all(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<Vec<RankingWithCandidate>>>, AppError> {
    let request = RankRequest::from_body(&body)?;

    let run = RankingReconciler::new(state.store.as_ref(), state.classifier.as_ref())
        .rank_all(request.criteria.as_deref())
        .await?;

    info!(
        epoch_id = run.epoch_id,
        criteria = %run.criteria,
        retried = run.retried,
        fallbacks = run.fallbacks,
        ranked = run.rankings.len(),
        "Rankings replaced"
    );
    Ok(Json(ApiResponse::new(run.rankings)))
}

/// GET /api/rankings
pub async fn handle_list_rankings(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<RankingWithCandidate>>, AppError> {
    let page = state.store.list_rankings(query.params()?).await?;
    Ok(Json(page))
}

/// GET /api/rankings/interview-list
pub async fn handle_interview_list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InterviewSplit>>, AppError> {
    let rankings = state.store.current_rankings().await?;
    Ok(Json(ApiResponse::new(split_by_interview(rankings))))
}
