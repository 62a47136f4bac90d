use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Invalid rate limit {max_requests}/{window_seconds}s: both values must be positive"
    )]
    InvalidRateLimit { max_requests: u32, window_seconds: u64 },

    #[error("At least one search backend is required")]
    NoBackends,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("No healthy search backends available")]
    NoHealthyBackend,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend {backend} returned {status}")]
    BadStatus { backend: String, status: u16 },

    #[error("Parse error: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after: u64 },

    #[error("Invalid request body")]
    InvalidBody,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Query parameter is required")]
    MissingQuery,

    #[error("Query must be less than {max} characters")]
    QueryTooLong { max: usize },

    #[error("Use POST method for search")]
    MethodNotAllowed,

    #[error("{0}")]
    SearchFailed(String),
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        AppError::SearchFailed(e.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidBody | AppError::MissingQuery | AppError::QueryTooLong { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::SearchFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let message = self.to_string();
        match self {
            AppError::RateLimited { retry_after } => json!({
                "error": "Too many requests",
                "message": message,
                "retryAfter": retry_after,
            }),
            AppError::QueryTooLong { .. } => json!({
                "error": "Query too long",
                "message": message,
            }),
            AppError::SearchFailed(_) => json!({
                "error": "Search failed",
                "message": message,
            }),
            AppError::InvalidBody
            | AppError::PayloadTooLarge
            | AppError::MissingQuery
            | AppError::MethodNotAllowed => json!({ "error": message }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();

        if let AppError::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
        }

        response
    }
}
