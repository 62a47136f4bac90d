use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("search_requests_total", "Total number of search requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("search_rate_limited_total", "Search requests rejected by the rate limiter").unwrap();
    pub static ref SEARCH_FAILURES: Counter =
        register_counter!("search_failures_total", "Searches that failed upstream").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "search_request_latency_seconds",
        "Upstream search latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_STORE_SIZE: Gauge =
        register_gauge!("rate_limit_store_size", "Clients currently tracked by the rate limiter").unwrap();
    pub static ref RATE_LIMIT_SWEPT: Counter =
        register_counter!("rate_limit_swept_total", "Expired rate limit entries evicted").unwrap();
    pub static ref HEALTHY_BACKENDS: Gauge =
        register_gauge!("search_healthy_backends", "Search backends currently marked healthy").unwrap();
}
