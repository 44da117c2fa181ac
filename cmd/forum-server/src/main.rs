//! # forum-server
//!
//! Assembles the forum from configuration: store, session verifier,
//! services and the HTTP router.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::AppState;
use auth_adapters::JwtSessionVerifier;
use configs::{AppConfig, DatabaseConfig, LogFormat, LoggingConfig};
use domains::SessionVerifier;
use services::{ForumServices, Repositories, ServiceSettings};
use storage_adapters::MemoryStore;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "forum server starting");

    let repositories = open_store(&config.database).await?;
    let trending_window = chrono::TimeDelta::try_hours(config.forum.trending_window_hours)
        .context("forum.trending_window_hours is out of range")?;
    let settings = ServiceSettings {
        trending_limit: config.forum.trending_limit,
        trending_window,
        default_category_color: config.forum.default_category_color.clone(),
    };
    let services = ForumServices::new(repositories, settings);
    let sessions: Arc<dyn SessionVerifier> = Arc::new(JwtSessionVerifier::new(&config.auth.jwt_secret));
    let app = api_adapters::router(AppState::new(services, sessions));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}

async fn open_store(config: &DatabaseConfig) -> anyhow::Result<Repositories> {
    if config.is_memory() {
        warn!("using the in-memory store; all data is lost on exit");
        return Ok(Repositories::from_store(Arc::new(MemoryStore::new())));
    }

    #[cfg(feature = "db-postgres")]
    {
        let store = storage_adapters::PgStore::connect(&config.url, config.max_connections)
            .await
            .context("connecting to postgres")?;
        store.migrate().await.context("running migrations")?;
        info!(max_connections = config.max_connections, "postgres store ready");
        Ok(Repositories::from_store(Arc::new(store)))
    }

    #[cfg(not(feature = "db-postgres"))]
    anyhow::bail!("database url {} needs the db-postgres feature", config.url)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
