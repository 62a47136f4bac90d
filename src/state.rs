use std::sync::Arc;

use crate::config::SearchSettings;
use crate::load_balancer::LoadBalancer;
use crate::rate_limit::{RateLimitConfig, RateLimiter};

// app's shared state
pub struct AppState {
    pub client: reqwest::Client,
    pub load_balancer: Arc<LoadBalancer>,
    pub rate_limiter: Arc<RateLimiter>,
    pub search_limit: RateLimitConfig, // quota for /api/search
    pub search: SearchSettings,
}
