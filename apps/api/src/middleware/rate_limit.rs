//! Per-IP sliding-window rate limiting.
//!
//! Two limiters live in `AppState`: a general one for every `/api` route and a
//! stricter one for the routes that call the classifier. Tracked IPs are
//! capped; idle entries are swept every `cleanup_interval` requests and
//! whenever the cap is reached.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub cleanup_interval: u64,
    pub max_tracked_ips: usize,
    /// Returned to rejected callers.
    pub message: &'static str,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64, message: &'static str) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            cleanup_interval: 100,
            max_tracked_ips: 10_000,
            message,
        }
    }
}

pub const API_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";
pub const AI_LIMIT_MESSAGE: &str =
    "Too many AI generation requests. Please wait before trying again.";

pub struct RateLimiter {
    config: RateLimitConfig,
    hits: RwLock<HashMap<IpAddr, Vec<Instant>>>,
    request_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: RwLock::new(HashMap::new()),
            request_count: AtomicU64::new(0),
        }
    }

    /// Records a request from `ip`, or rejects it if the window is full.
    pub fn check(&self, ip: IpAddr) -> Result<(), AppError> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), AppError> {
        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.config.cleanup_interval == 0 {
            self.cleanup_at(now);
            tracing::debug!(request_count = count, tracked = self.tracked_ips(), "Periodic rate limiter cleanup done");
        }

        let cutoff = now.checked_sub(self.config.window).unwrap_or(now);
        let mut hits = self.hits.write().unwrap_or_else(PoisonError::into_inner);

        if !hits.contains_key(&ip) && hits.len() >= self.config.max_tracked_ips {
            hits.retain(|_, stamps| stamps.iter().any(|&t| t > cutoff));
            if hits.len() >= self.config.max_tracked_ips {
                tracing::warn!(%ip, tracked = hits.len(), "Rate limiter at capacity, rejecting new IP");
                return Err(AppError::RateLimited(self.config.message.to_string()));
            }
        }

        let stamps = hits.entry(ip).or_default();
        stamps.retain(|&t| t > cutoff);
        if stamps.len() >= self.config.max_requests as usize {
            tracing::warn!(%ip, requests = stamps.len(), max = self.config.max_requests, "Rate limit exceeded");
            return Err(AppError::RateLimited(self.config.message.to_string()));
        }
        stamps.push(now);
        Ok(())
    }

    /// Drops IPs with no request inside the current window.
    fn cleanup_at(&self, now: Instant) {
        let cutoff = now.checked_sub(self.config.window).unwrap_or(now);
        let mut hits = self.hits.write().unwrap_or_else(PoisonError::into_inner);
        hits.retain(|_, stamps| {
            stamps.retain(|&t| t > cutoff);
            !stamps.is_empty()
        });
    }

    pub fn tracked_ips(&self) -> usize {
        self.hits.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Peer address as recorded by `into_make_service_with_connect_info`.
/// Requests without one (in-process tests) share the unspecified address.
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn api_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    state.api_limiter.check(client_ip(&req))?;
    Ok(next.run(req).await)
}

pub async fn ai_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    state.ai_limiter.check(client_ip(&req))?;
    Ok(next.run(req).await)
}
