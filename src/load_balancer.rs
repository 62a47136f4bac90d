use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::time::{Duration, interval};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::metrics::HEALTHY_BACKENDS;

// Single upstream search server
#[derive(Debug)]
pub struct Backend {
    pub url: String,
    healthy: AtomicBool,
}

impl Backend {
    pub fn new(url: String) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }
}

// Round-robin over the search backends, skipping unhealthy ones
#[derive(Debug)]
pub struct LoadBalancer {
    backends: Vec<Arc<Backend>>,
    current: AtomicUsize,
}

impl LoadBalancer {
    pub fn new(urls: Vec<String>) -> Result<Self, ConfigError> {
        if urls.is_empty() {
            return Err(ConfigError::NoBackends);
        }

        let backends: Vec<Arc<Backend>> = urls
            .into_iter()
            .map(|url| Arc::new(Backend::new(url)))
            .collect();

        info!(count = backends.len(), "Load balancer initialized");
        for (i, b) in backends.iter().enumerate() {
            info!("  [{}] {}", i + 1, b.url);
        }
        HEALTHY_BACKENDS.set(backends.len() as f64);

        Ok(Self {
            backends,
            current: AtomicUsize::new(0),
        })
    }

    // Next healthy backend, None if every backend is down
    pub fn get_backend(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        let start = self.current.fetch_add(1, Ordering::Relaxed) % len;

        (0..len)
            .map(|i| &self.backends[(start + i) % len])
            .find(|backend| backend.is_healthy())
            .cloned()
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn healthy_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_healthy()).count()
    }
}

// Health check loop - probes every backend's /health each tick
pub async fn health_checker(
    load_balancer: Arc<LoadBalancer>,
    client: reqwest::Client,
    check_interval: Duration,
) {
    let mut interval = interval(check_interval);

    info!(?check_interval, "Health checker started");

    loop {
        interval.tick().await;

        for backend in load_balancer.all_backends() {
            let url = format!("{}/health", backend.url);

            let was_healthy = backend.is_healthy();

            let is_healthy = match client.get(&url).timeout(Duration::from_secs(5)).send().await {
                Ok(res) => res.status().is_success(),
                Err(_) => false,
            };
            backend.set_healthy(is_healthy);

            if was_healthy != is_healthy {
                if is_healthy {
                    info!(backend = %backend.url, "Backend is now healthy");
                } else {
                    warn!(backend = %backend.url, "Backend is now unhealthy");
                }
            }
        }

        HEALTHY_BACKENDS.set(load_balancer.healthy_count() as f64);
    }
}
