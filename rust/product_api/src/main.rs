use common::GatewayEnv;
use kaspi_product_api::{app, rate_limit::{self, RateLimiter}, upstream::KaspiClient, AppState};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let env = GatewayEnv::from_env()?;
    let window = Duration::from_millis(env.rate_limit_window_ms);

    let source = KaspiClient::new(&env.upstream_base_url, Duration::from_millis(env.upstream_timeout_ms))?;
    let limiter = Arc::new(RateLimiter::new(env.rate_limit_max, window));
    rate_limit::spawn_sweeper(limiter.clone(), window);

    let state = AppState::new(Arc::new(source), limiter)
        .with_status_passthrough(env.upstream_status_passthrough);

    let listener = tokio::net::TcpListener::bind(env.bind_addr()).await?;
    let addr = listener.local_addr()?;
    info!("kaspi_product_api listening on {}", addr);
    info!("status: http://localhost:{}/status", addr.port());

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
