use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use search_gateway::{
    build_router,
    client_id::ClientIdResolver,
    clock::SystemClock,
    config::{Args, Settings},
    load_balancer::{LoadBalancer, health_checker},
    rate_limit::RateLimiter,
    state::AppState,
    sweeper::Sweeper,
};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let settings = match Settings::try_from(Args::parse()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let load_balancer = Arc::new(LoadBalancer::new(settings.backends.clone())?);
    let rate_limiter = Arc::new(RateLimiter::new(
        Arc::new(SystemClock),
        ClientIdResolver::new(settings.client_id_headers.clone()),
    ));

    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        load_balancer: load_balancer.clone(),
        rate_limiter: rate_limiter.clone(),
        search_limit: settings.rate_limit,
        search: settings.search,
    });

    tokio::spawn(health_checker(
        load_balancer,
        reqwest::Client::new(),
        settings.health_interval,
    ));
    let sweeper = Sweeper::start(rate_limiter, settings.sweep_interval);

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Gateway running on http://localhost:{}", settings.port);
    info!(
        "Rate limit: {} requests per {} seconds, keyed by {:?}",
        settings.rate_limit.max_requests(),
        settings.rate_limit.window_seconds(),
        settings.client_id_headers
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
