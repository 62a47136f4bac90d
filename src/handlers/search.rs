use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::error::AppError;
use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_LATENCY, REQUEST_TOTAL, SEARCH_FAILURES};
use crate::models::{SearchRequest, SearchResponse};
use crate::search;
use crate::state::AppState;

// Rate limit first, then validate and forward. Every response carries the
// X-RateLimit-* headers, denied or not. The body rejection is held until
// after the check so oversized bodies still count against the quota
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    REQUEST_TOTAL.inc();

    let limit = state
        .rate_limiter
        .check_rate_limit(&headers, &state.search_limit);

    let outcome = if limit.allowed {
        match body {
            Ok(body) => run_search(&state, &body).await,
            Err(rejection) => Err(body_rejection(rejection)),
        }
    } else {
        RATE_LIMITED_TOTAL.inc();
        Err(AppError::RateLimited {
            retry_after: state.rate_limiter.retry_after_secs(&limit),
        })
    };

    (limit.header_map(), outcome).into_response()
}

async fn run_search(state: &AppState, body: &[u8]) -> Result<Json<SearchResponse>, AppError> {
    let request: SearchRequest =
        serde_json::from_slice(body).map_err(|_| AppError::InvalidBody)?;
    let query = search::validate(request, &state.search)?;

    debug!(query = %query.query, limit = query.limit, "Forwarding search");
    let start_time = Instant::now();

    let results = search::search(&state.client, &state.load_balancer, &state.search, &query)
        .await
        .inspect_err(|e| {
            SEARCH_FAILURES.inc();
            error!(error = %e, "Search error");
        })?;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    Ok(Json(SearchResponse {
        count: results.len(),
        results,
        query: query.query,
    }))
}

fn body_rejection(rejection: BytesRejection) -> AppError {
    debug!(error = %rejection, "Rejected search body");
    match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
        _ => AppError::InvalidBody,
    }
}

pub async fn search_method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
