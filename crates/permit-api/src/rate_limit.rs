//! Per-client rate limiting for the public check endpoint.
//!
//! Clients are keyed by peer IP as reported by axum's `ConnectInfo`. When the
//! router is served without connect info every request shares the unspecified
//! address and therefore one quota.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::Clock;
use governor::DefaultKeyedRateLimiter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Keyed limiter guarding `/check`.
pub type CheckLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Forget clients whose quota has fully replenished.
///
/// Such a client is indistinguishable from one never seen, so dropping it
/// changes no decision and keeps the table bounded by recent traffic.
pub fn prune(limiter: &CheckLimiter) {
    limiter.retain_recent();
    limiter.shrink_to_fit();
}

/// Run [`prune`] every `period` until the task is aborted.
pub fn spawn_pruner(limiter: Arc<CheckLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            prune(&limiter);
            debug!(clients = limiter.len(), "pruned check rate limits");
        }
    })
}

fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip())
}

pub async fn rate_limit_middleware(limiter: Arc<CheckLimiter>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);

    match limiter.check_key(&ip) {
        Ok(()) => next.run(req).await,
        Err(not_until) => {
            let wait = not_until.wait_time_from(limiter.clock().now());
            warn!(client = %ip, retry_after_secs = wait.as_secs(), "check quota exhausted");
            ApiError::RateLimited {
                retry_after_secs: wait.as_secs().max(1),
            }
            .into_response()
        }
    }
}
