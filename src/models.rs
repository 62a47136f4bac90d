use serde::{Deserialize, Serialize};
use serde_json::Value;

// Search API request format. Fields stay loose so bad types surface as 400s
// from validation instead of extractor rejections
#[derive(Deserialize, Debug, Default)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub limit: Option<Value>,
}

// Search API response format
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<Value>,
    pub count: usize,
    pub query: String,
}

// What we send to an upstream search backend
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamSearchRequest {
    pub query: String,
    pub limit: usize,
    pub embedding_provider: EmbeddingProvider,
}

// What an upstream search backend sends back
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct UpstreamSearchResponse {
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(clap::ValueEnum, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Local,
    Gemini,
    Openai,
}
