//! Per-IP request throttling.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Token bucket per client IP: `rate_limit_requests` per window, refilled evenly
pub fn build_rate_limiter(api: &ApiConfig) -> Arc<IpRateLimiter> {
    let burst = NonZeroU32::new(api.rate_limit_requests).unwrap_or(NonZeroU32::MIN);
    let window = Duration::from_secs(api.rate_limit_window_secs.max(1));

    let quota = Quota::with_period(window / burst.get())
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst);

    Arc::new(RateLimiter::keyed(quota))
}

/// Drops buckets that have refilled completely, since they behave like new ones
pub fn prune_rate_limiter(limiter: &IpRateLimiter) {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    debug!("Rate limiter tracking {} client addresses", limiter.len());
}

/// Runs [`prune_rate_limiter`] every `interval` for the life of the process
pub async fn prune_task(limiter: Arc<IpRateLimiter>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        prune_rate_limiter(&limiter);
    }
}

/// Rejects with 429 once the client IP has spent its quota. Requests without
/// connection info (in-process calls) are not throttled.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.api.enable_rate_limiting {
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        if let Some(ip) = client {
            if state.rate_limiter.check_key(&ip).is_err() {
                warn!("Rate limit exceeded for {}", ip);
                return Err(ApiError::too_many_requests(
                    "Too many requests from this IP, please try again later.",
                ));
            }
        }
    }

    Ok(next.run(request).await)
}
