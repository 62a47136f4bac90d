use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::RETRY_AFTER},
    response::Response,
    routing::post,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use search_gateway::{
    build_router,
    client_id::ClientIdResolver,
    clock::ManualClock,
    config::SearchSettings,
    load_balancer::LoadBalancer,
    models::UpstreamSearchRequest,
    rate_limit::{RateLimitConfig, RateLimiter},
    state::AppState,
};

const START: i64 = 1_700_000_000_000;

struct Harness {
    clock: Arc<ManualClock>,
    limiter: Arc<RateLimiter>,
    app: Router,
}

impl Harness {
    fn new(backend: &str, limit: RateLimitConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = Arc::new(RateLimiter::new(clock.clone(), ClientIdResolver::default()));
        let state = Arc::new(AppState {
            client: reqwest::Client::new(),
            load_balancer: Arc::new(LoadBalancer::new(vec![backend.to_string()]).unwrap()),
            rate_limiter: limiter.clone(),
            search_limit: limit,
            search: SearchSettings::default(),
        });

        Self {
            clock,
            limiter,
            app: build_router(state),
        }
    }

    async fn post(&self, ip: &str, body: Value) -> Response {
        let request = Request::post("/api/search")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(body.to_string()))
            .unwrap();

        self.app.clone().oneshot(request).await.unwrap()
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// Upstream that returns `limit` numbered hits for any query
async fn spawn_upstream() -> String {
    async fn search(Json(req): Json<UpstreamSearchRequest>) -> Json<Value> {
        let results: Vec<Value> = (0..req.limit)
            .map(|i| json!({ "slug": format!("doc-{i}"), "query": req.query }))
            .collect();
        Json(json!({ "results": results }))
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/search", post(search));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

// Port 9 on loopback is never going to answer
const DEAD_BACKEND: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn every_response_carries_rate_limit_headers() {
    let harness = Harness::new(DEAD_BACKEND, RateLimitConfig::SEARCH);

    let response = harness.post("1.2.3.4", json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-ratelimit-limit"], "20");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "19");
    assert_eq!(response.headers()["x-ratelimit-reset"], "1700000060");
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Query parameter is required" })
    );
}

#[tokio::test]
async fn twenty_first_request_is_rejected_with_retry_after() {
    let harness = Harness::new(DEAD_BACKEND, RateLimitConfig::SEARCH);

    for _ in 0..20 {
        let response = harness.post("10.20.30.40", json!({})).await;
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    harness.clock.advance_secs(15);
    let response = harness.post("10.20.30.40", json!({"query": "rust"})).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[RETRY_AFTER], "45");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(
        json_body(response).await,
        json!({
            "error": "Too many requests",
            "message": "Rate limit exceeded. Please try again later.",
            "retryAfter": 45,
        })
    );

    // a different client is unaffected
    let other = harness.post("5.6.7.8", json!({})).await;
    assert_eq!(other.status(), StatusCode::BAD_REQUEST);
    assert_eq!(other.headers()["x-ratelimit-remaining"], "19");
}

#[tokio::test]
async fn quota_returns_after_the_window() {
    let harness = Harness::new(DEAD_BACKEND, RateLimitConfig::new(2, 60).unwrap());

    for _ in 0..2 {
        harness.post("1.2.3.4", json!({})).await;
    }
    let blocked = harness.post("1.2.3.4", json!({})).await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    harness.clock.advance_secs(61);

    let after_reset = harness.post("1.2.3.4", json!({})).await;
    assert_eq!(after_reset.status(), StatusCode::BAD_REQUEST);
    assert_eq!(after_reset.headers()["x-ratelimit-remaining"], "1");
}

#[tokio::test]
async fn rejects_bad_bodies() {
    let harness = Harness::new(DEAD_BACKEND, RateLimitConfig::SEARCH);

    let too_long = harness
        .post("1.2.3.4", json!({ "query": "q".repeat(501) }))
        .await;
    assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(too_long).await,
        json!({
            "error": "Query too long",
            "message": "Query must be less than 500 characters",
        })
    );

    let request = Request::post("/api/search")
        .header("x-forwarded-for", "1.2.3.4")
        .body(Body::from("not json"))
        .unwrap();
    let garbage = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(garbage).await,
        json!({ "error": "Invalid request body" })
    );
}

#[tokio::test]
async fn oversized_body_still_counts_against_quota() {
    let harness = Harness::new(DEAD_BACKEND, RateLimitConfig::new(1, 60).unwrap());
    // over axum's default 2 MB body limit
    let huge = "a".repeat(3 * 1024 * 1024);

    let send = || {
        let request = Request::post("/api/search")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "6.6.6.6")
            .body(Body::from(huge.clone()))
            .unwrap();
        harness.app.clone().oneshot(request)
    };

    let first = send().await.unwrap();
    assert_eq!(first.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(first.headers()["x-ratelimit-limit"], "1");
    assert_eq!(first.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(
        json_body(first).await,
        json!({ "error": "Request body too large" })
    );
    assert_eq!(harness.limiter.entry("6.6.6.6").unwrap().count, 1);

    let second = send().await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key(RETRY_AFTER));
    assert_eq!(harness.limiter.entry("6.6.6.6").unwrap().count, 2);
}

#[tokio::test]
async fn get_is_not_allowed() {
    let harness = Harness::new(DEAD_BACKEND, RateLimitConfig::SEARCH);

    let request = Request::get("/api/search").body(Body::empty()).unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Use POST method for search" })
    );
}

#[tokio::test]
async fn forwards_to_upstream_with_clamped_limit() {
    let upstream = spawn_upstream().await;
    let harness = Harness::new(&upstream, RateLimitConfig::SEARCH);

    let response = harness
        .post("1.2.3.4", json!({ "query": "vector search", "limit": 100 }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "19");

    let body = json_body(response).await;
    assert_eq!(body["count"], 20);
    assert_eq!(body["query"], "vector search");
    assert_eq!(body["results"].as_array().unwrap().len(), 20);
    assert_eq!(body["results"][0]["slug"], "doc-0");

    let defaulted = json_body(harness.post("1.2.3.4", json!({ "query": "rust" })).await).await;
    assert_eq!(defaulted["count"], 10);
}

#[tokio::test]
async fn unreachable_upstream_is_a_search_failure() {
    let harness = Harness::new(DEAD_BACKEND, RateLimitConfig::SEARCH);

    let response = harness.post("1.2.3.4", json!({ "query": "rust" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-ratelimit-limit"));

    let body = json_body(response).await;
    assert_eq!(body["error"], "Search failed");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn health_reports_healthy() {
    let harness = Harness::new(DEAD_BACKEND, RateLimitConfig::SEARCH);

    let request = Request::get("/health").body(Body::empty()).unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}
