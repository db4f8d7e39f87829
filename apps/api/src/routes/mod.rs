pub mod health;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::candidates::handlers as candidates;
use crate::generation::handlers as generation;
use crate::middleware::auth::require_api_key;
use crate::middleware::rate_limit::{ai_rate_limit, api_rate_limit};
use crate::ranking::handlers as ranking;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Routes that call the classifier: API key first, then the AI limiter.
    let ai_routes = Router::new()
        .route("/api/candidates", post(candidates::handle_create_candidate))
        .route("/api/candidates/generate", post(generation::handle_generate))
        .route("/api/rankings", post(ranking::handle_rank_all))
        .route_layer(from_fn_with_state(state.clone(), ai_rate_limit))
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    let api_routes = Router::new()
        .route("/api/candidates", get(candidates::handle_list_candidates))
        .route(
            "/api/candidates/:id",
            get(candidates::handle_get_candidate).delete(candidates::handle_delete_candidate),
        )
        .route("/api/rankings", get(ranking::handle_list_rankings))
        .route(
            "/api/rankings/interview-list",
            get(ranking::handle_interview_list),
        )
        .merge(ai_routes)
        .route_layer(from_fn_with_state(state.clone(), api_rate_limit));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api_routes)
        .with_state(state)
}
