//! Shared handler state.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::DecodingKey;
use permit_store::Keeper;

use tokio::task::JoinHandle;

use crate::rate_limit::{self, CheckLimiter};

/// Default `/check` quota per client per hour.
pub const DEFAULT_CHECK_REQUESTS_PER_HOUR: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => unreachable!(),
};

/// How often a served router forgets idle `/check` clients.
pub const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Service settings the router needs.
#[derive(Clone)]
pub struct ApiConfig {
    /// HS256 secret create requests must be signed with.
    pub jwt_secret: String,
    /// `/check` quota per client IP.
    pub check_requests_per_hour: NonZeroU32,
}

impl ApiConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            check_requests_per_hour: DEFAULT_CHECK_REQUESTS_PER_HOUR,
        }
    }

    pub fn check_requests_per_hour(mut self, quota: NonZeroU32) -> Self {
        self.check_requests_per_hour = quota;
        self
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("jwt_secret", &"<redacted>")
            .field("check_requests_per_hour", &self.check_requests_per_hour)
            .finish()
    }
}

/// State shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub keeper: Arc<dyn Keeper>,
    pub(crate) decoding_key: Arc<DecodingKey>,
    pub(crate) limiter: Arc<CheckLimiter>,
}

impl AppState {
    pub fn new(keeper: Arc<dyn Keeper>, config: &ApiConfig) -> Self {
        Self {
            keeper,
            decoding_key: Arc::new(DecodingKey::from_secret(config.jwt_secret.as_bytes())),
            limiter: Arc::new(CheckLimiter::keyed(governor::Quota::per_hour(
                config.check_requests_per_hour,
            ))),
        }
    }

    /// Periodically drop rate-limit entries for clients whose quota has
    /// replenished. Abort the handle when the server stops.
    pub fn spawn_rate_limit_pruner(&self, period: Duration) -> JoinHandle<()> {
        rate_limit::spawn_pruner(Arc::clone(&self.limiter), period)
    }
}
