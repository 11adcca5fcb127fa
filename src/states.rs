use std::{num::NonZeroU32, sync::Arc};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::{config::Config, store::Store};

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Cloned into every handler. All fields are `Arc`s (the store wraps its
/// maps), so a clone is a handful of reference-count bumps.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
    /// Global quota on login attempts.
    pub login_limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        let per_minute = NonZeroU32::new(config.login_rate_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            store,
            login_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            config: Arc::new(config),
        }
    }
}
