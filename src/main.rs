use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use grouplist_api::config::AppConfig;
use grouplist_api::database::DatabaseManager;
use grouplist_api::middleware::prune_task;
use grouplist_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("grouplist_api=info,tower_http=info")),
        )
        .init();

    let config: AppConfig = grouplist_api::config::config().clone();
    config.validate().map_err(anyhow::Error::msg)?;
    info!("Starting Grouplist API in {:?} mode", config.environment);

    let store = DatabaseManager::open_store(&config.database)
        .await
        .context("failed to open registry store")?;
    info!("Using {} store", store.backend());

    let port = config.api.port;
    let prune_every = config
        .api
        .enable_rate_limiting
        .then(|| Duration::from_secs(config.api.rate_limit_window_secs.max(60)));
    let state = AppState::new(config, store);
    bootstrap_admin(&state).await?;

    if let Some(interval) = prune_every {
        tokio::spawn(prune_task(state.rate_limiter.clone(), interval));
    }

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Grouplist API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        grouplist_api::app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    Ok(())
}

async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let security = &state.config.security;
    let Some(password) = security.bootstrap_admin_password.as_deref() else {
        return Ok(());
    };

    match state
        .user_service()
        .bootstrap_admin(&security.bootstrap_admin_username, password)
        .await
    {
        Ok(Some(user)) => {
            warn!(
                "Created default admin '{}'; change its password before exposing this server",
                user.username
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(anyhow::anyhow!("failed to bootstrap admin account: {}", e)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
