use axum::http::HeaderMap;

// Shared bucket for callers we can't identify
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

// First non-empty header wins, each value cut at its first comma and trimmed.
// Spoofable, it's only an abuse deterrent
#[derive(Debug, Clone)]
pub struct ClientIdResolver {
    headers: Vec<String>,
}

impl Default for ClientIdResolver {
    fn default() -> Self {
        Self::new([CF_CONNECTING_IP, X_REAL_IP, X_FORWARDED_FOR])
    }
}

impl ClientIdResolver {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|h| h.into().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn resolve(&self, headers: &HeaderMap) -> String {
        self.headers
            .iter()
            .find_map(|name| first_entry(headers, name))
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

fn first_entry(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();

    (!first.is_empty()).then(|| first.to_string())
}
