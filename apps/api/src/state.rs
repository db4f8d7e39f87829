use std::sync::Arc;

use crate::classifier::ClassifierGateway;
use crate::config::Config;
use crate::middleware::rate_limit::{
    RateLimitConfig, RateLimiter, AI_LIMIT_MESSAGE, API_LIMIT_MESSAGE,
};
use crate::store::CandidateStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Default: PgCandidateStore. Tests use the in-memory store.
    pub store: Arc<dyn CandidateStore>,
    /// Default: ClaudeClassifier. Tests use a scripted classifier.
    pub classifier: Arc<dyn ClassifierGateway>,
    pub config: Config,
    pub api_limiter: Arc<RateLimiter>,
    /// Stricter limiter for generate and rank.
    pub ai_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        classifier: Arc<dyn ClassifierGateway>,
        config: Config,
    ) -> Self {
        let api_limiter = RateLimiter::new(RateLimitConfig::new(
            config.api_rate_limit,
            config.rate_limit_window_secs,
            API_LIMIT_MESSAGE,
        ));
        let ai_limiter = RateLimiter::new(RateLimitConfig::new(
            config.ai_rate_limit,
            config.rate_limit_window_secs,
            AI_LIMIT_MESSAGE,
        ));

        Self {
            store,
            classifier,
            config,
            api_limiter: Arc::new(api_limiter),
            ai_limiter: Arc::new(ai_limiter),
        }
    }
}
