use std::time::Duration;

use clap::Parser;

use crate::client_id::{CF_CONNECTING_IP, X_FORWARDED_FOR, X_REAL_IP};
use crate::error::ConfigError;
use crate::models::EmbeddingProvider;
use crate::rate_limit::RateLimitConfig;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "search-gateway")]
#[command(about = "Rate limited gateway for semantic search backends")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "SEARCH_GATEWAY_PORT", default_value_t = 8080)]
    pub port: u16,

    // Search backends (comma-separated)
    // Example: "localhost:7700,localhost:7701"
    #[arg(short, long, env = "SEARCH_BACKENDS", default_value = "localhost:7700")]
    pub backends: String,

    // Rate limit max requests per window on /api/search
    #[arg(long, env = "SEARCH_RATE_LIMIT", default_value_t = 20)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "SEARCH_RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // How often expired rate limit entries are evicted, in seconds
    #[arg(long, env = "RATE_LIMIT_SWEEP_INTERVAL", default_value_t = 300)]
    pub sweep_interval: u64,

    // Headers used to identify a client, highest priority first
    #[arg(
        long,
        env = "CLIENT_ID_HEADERS",
        value_delimiter = ',',
        default_values_t = [
            CF_CONNECTING_IP.to_string(),
            X_REAL_IP.to_string(),
            X_FORWARDED_FOR.to_string(),
        ]
    )]
    pub client_id_headers: Vec<String>,

    // Longest accepted query, in characters
    #[arg(long, env = "SEARCH_MAX_QUERY_LENGTH", default_value_t = 500)]
    pub max_query_length: usize,

    // Upper bound on results per search
    #[arg(long, env = "SEARCH_MAX_RESULTS", default_value_t = 20)]
    pub max_results: usize,

    // Embedding provider requested from the backends
    #[arg(long, env = "EMBEDDING_PROVIDER", value_enum, default_value_t = EmbeddingProvider::Local)]
    pub embedding_provider: EmbeddingProvider,

    // Health check interval in seconds
    #[arg(long, env = "SEARCH_HEALTH_INTERVAL", default_value_t = 30)]
    pub health_interval: u64,

    // Upstream request timeout in seconds
    #[arg(long, env = "SEARCH_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,
}

// Validated runtime settings derived from Args
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub backends: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub sweep_interval: Duration,
    pub client_id_headers: Vec<String>,
    pub search: SearchSettings,
    pub health_interval: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub max_query_length: usize,
    pub max_results: usize,
    pub default_results: usize,
    pub embedding_provider: EmbeddingProvider,
    pub timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_query_length: 500,
            max_results: 20,
            default_results: 10,
            embedding_provider: EmbeddingProvider::Local,
            timeout: Duration::from_secs(10),
        }
    }
}

impl TryFrom<Args> for Settings {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let backends = parse_backends(&args.backends);
        if backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }

        let max_results = args.max_results.max(1);

        Ok(Self {
            port: args.port,
            backends,
            rate_limit: RateLimitConfig::new(args.rate_limit, args.rate_window)?,
            sweep_interval: Duration::from_secs(args.sweep_interval.max(1)),
            client_id_headers: args.client_id_headers,
            search: SearchSettings {
                max_query_length: args.max_query_length,
                max_results,
                default_results: SearchSettings::default().default_results.min(max_results),
                embedding_provider: args.embedding_provider,
                timeout: Duration::from_secs(args.timeout),
            },
            health_interval: Duration::from_secs(args.health_interval.max(1)),
        })
    }
}

// "localhost:7700, http://search:7700" -> full urls, blanks dropped
pub fn parse_backends(backends: &str) -> Vec<String> {
    backends
        .split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(|url| {
            if url.starts_with("http") {
                url.to_string()
            } else {
                format!("http://{}", url)
            }
        })
        .collect()
}
