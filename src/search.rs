// Search request validation and the call out to a search backend

use serde_json::Value;
use tracing::warn;

use crate::config::SearchSettings;
use crate::error::{AppError, SearchError};
use crate::load_balancer::LoadBalancer;
use crate::models::{SearchRequest, UpstreamSearchRequest, UpstreamSearchResponse};

// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidQuery {
    pub query: String,
    pub limit: usize,
}

pub fn validate(request: SearchRequest, settings: &SearchSettings) -> Result<ValidQuery, AppError> {
    let query = match request.query {
        Some(Value::String(q)) if !q.is_empty() => q,
        _ => return Err(AppError::MissingQuery),
    };

    // length in UTF-16 units
    if query.encode_utf16().count() > settings.max_query_length {
        return Err(AppError::QueryTooLong {
            max: settings.max_query_length,
        });
    }

    Ok(ValidQuery {
        query,
        limit: sanitize_limit(request.limit.as_ref(), settings),
    })
}

// Clamp into 1..=max_results, missing/zero/non-numeric fall back to the default
pub fn sanitize_limit(limit: Option<&Value>, settings: &SearchSettings) -> usize {
    let requested = limit
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|n| n.is_finite() && *n != 0.0);

    match requested {
        None => settings.default_results,
        Some(n) if n < 1.0 => 1,
        Some(n) => (n.floor() as usize).clamp(1, settings.max_results),
    }
}

pub async fn search(
    client: &reqwest::Client,
    load_balancer: &LoadBalancer,
    settings: &SearchSettings,
    query: &ValidQuery,
) -> Result<Vec<Value>, SearchError> {
    let backend = load_balancer
        .get_backend()
        .ok_or(SearchError::NoHealthyBackend)?;

    let payload = UpstreamSearchRequest {
        query: query.query.clone(),
        limit: query.limit,
        embedding_provider: settings.embedding_provider,
    };

    let res = client
        .post(format!("{}/search", backend.url))
        .timeout(settings.timeout)
        .json(&payload)
        .send()
        .await
        .inspect_err(|e| {
            // connection level failures take the backend out of rotation
            if e.is_connect() || e.is_timeout() {
                backend.set_healthy(false);
                warn!(backend = %backend.url, "Backend failed, marked unhealthy");
            }
        })?;

    if !res.status().is_success() {
        return Err(SearchError::BadStatus {
            backend: backend.url.clone(),
            status: res.status().as_u16(),
        });
    }

    let body = res
        .json::<UpstreamSearchResponse>()
        .await
        .map_err(|e| SearchError::Decode(e.to_string()))?;

    let mut results = body.results;
    results.truncate(query.limit);
    Ok(results)
}
