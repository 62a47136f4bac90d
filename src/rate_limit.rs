use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use dashmap::DashMap;
use tracing::debug;

use crate::client_id::ClientIdResolver;
use crate::clock::Clock;
use crate::error::ConfigError;

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";

// Rate limit config - requests allowed per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    max_requests: u32,
    window_seconds: u64,
}

impl RateLimitConfig {
    // Quota applied to the semantic search endpoint
    pub const SEARCH: Self = Self {
        max_requests: 20,
        window_seconds: 60,
    };

    pub fn new(max_requests: u32, window_seconds: u64) -> Result<Self, ConfigError> {
        if max_requests == 0 || window_seconds == 0 {
            return Err(ConfigError::InvalidRateLimit {
                max_requests,
                window_seconds,
            });
        }

        Ok(Self {
            max_requests,
            window_seconds,
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    fn window_millis(&self) -> i64 {
        i64::try_from(self.window_seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_seconds: 60,
        }
    }
}

// Rate limit entry - tracks requests per client id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: i64, // epoch millis
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: i64, // epoch millis
}

// X-RateLimit-* headers, reset is in unix seconds
pub fn create_rate_limit_headers(result: &RateLimitResult) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        (HEADER_LIMIT, result.limit.to_string()),
        (HEADER_REMAINING, result.remaining.to_string()),
        (HEADER_RESET, result.reset_time.div_euclid(1000).to_string()),
    ])
}

impl RateLimitResult {
    pub fn header_map(&self) -> HeaderMap {
        create_rate_limit_headers(self)
            .into_iter()
            .filter_map(|(name, value)| {
                Some((
                    HeaderName::from_bytes(name.as_bytes()).ok()?,
                    HeaderValue::from_str(&value).ok()?,
                ))
            })
            .collect()
    }
}

// Fixed-window counters per client id, in process memory only.
// check_key holds the key's shard lock from lookup through increment
pub struct RateLimiter {
    store: DashMap<String, RateLimitEntry>,
    clock: Arc<dyn Clock>,
    resolver: ClientIdResolver,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, resolver: ClientIdResolver) -> Self {
        Self {
            store: DashMap::new(),
            clock,
            resolver,
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn entry(&self, client_id: &str) -> Option<RateLimitEntry> {
        self.store.get(client_id).map(|e| *e)
    }

    // Resolve the caller from headers and count one request against its quota
    pub fn check_rate_limit(&self, headers: &HeaderMap, config: &RateLimitConfig) -> RateLimitResult {
        let client_id = self.resolver.resolve(headers);
        self.check_key(&client_id, config)
    }

    pub fn check_key(&self, client_id: &str, config: &RateLimitConfig) -> RateLimitResult {
        let now = self.clock.now_millis();
        let fresh = || RateLimitEntry {
            count: 0,
            reset_time: now.saturating_add(config.window_millis()),
        };

        let mut entry = self
            .store
            .entry(client_id.to_string())
            .or_insert_with(fresh);

        // window expired..? start a new one anchored at this request
        if now > entry.reset_time {
            *entry = fresh();
        }

        entry.count = entry.count.saturating_add(1);

        let result = RateLimitResult {
            allowed: entry.count <= config.max_requests,
            limit: config.max_requests,
            remaining: config.max_requests.saturating_sub(entry.count),
            reset_time: entry.reset_time,
        };

        if !result.allowed {
            debug!(client_id, count = entry.count, "Rate limit exceeded");
        }

        result
    }

    // Whole seconds until the result's window resets, never negative
    pub fn retry_after_secs(&self, result: &RateLimitResult) -> u64 {
        let millis = result.reset_time.saturating_sub(self.clock.now_millis()).max(0);
        u64::try_from(millis.saturating_add(999) / 1000).unwrap_or(0)
    }

    // Evict entries whose window already ended, returns how many went
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.store.len();

        self.store.retain(|_, entry| entry.reset_time >= now);

        before.saturating_sub(self.store.len())
    }
}
