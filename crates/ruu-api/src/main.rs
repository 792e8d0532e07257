//! RUU API Server
//!
//! REST API server for the RUU property rental backend.
//!
//! Author: alfredo.tarigan@gmail.com

use anyhow::Context;
use ruu_api::auth::{session, PasswordConfig};
use ruu_api::state::{AppState, Repositories};
use ruu_api::create_router;
use ruu_core::config::{AppConfig, LoggingConfig};
use ruu_core::PgStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: RUU_CONFIG names a TOML file, env always wins
    let config = match std::env::var("RUU_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .and_then(AppConfig::with_env_override)
            .with_context(|| format!("loading configuration from {path}"))?,
        Err(_) => AppConfig::from_env().context("loading configuration from environment")?,
    };

    init_tracing(&config.logging);

    // PostgreSQL
    let store = PgStore::connect(&config.database)
        .await
        .context("connecting to PostgreSQL")?;
    if config.database.run_migrations {
        store.migrate().await.context("running migrations")?;
        tracing::info!("Database migrations applied");
    }

    // Session cache
    let sessions = session::connect(&config.session)
        .await
        .context("connecting to the session cache")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(
        config,
        Repositories::postgres(store),
        sessions,
        PasswordConfig::default(),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("RUU API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ruu_api={0},ruu_core={0},audit=info,tower_http=info", logging.level).into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
