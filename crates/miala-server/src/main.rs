//! Miala Server: application entry point.

use std::sync::Arc;

use anyhow::Context;
use miala_auth::sweeper;
use miala_db::{DbManager, run_migrations};
use miala_server::{AppState, Mailer, ServerConfig, router};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("miala=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting Miala server...");

    let config = ServerConfig::from_env()?;

    let db = DbManager::connect(&config.db)
        .await
        .context("failed to connect to SurrealDB")?;
    run_migrations(db.client())
        .await
        .context("failed to run migrations")?;

    let mailer = Arc::new(Mailer::from_config(&config));
    let state = AppState::new(db.client(), config.auth.clone(), mailer);

    let auth = Arc::clone(&state.auth);
    sweeper::spawn("expired_otps", config.otp_sweep_period, move || {
        let auth = Arc::clone(&auth);
        async move { auth.cleanup_expired_otps().await }
    });
    let auth = Arc::clone(&state.auth);
    sweeper::spawn("stale_signups", config.signup_sweep_period, move || {
        let auth = Arc::clone(&auth);
        async move { auth.cleanup_stale_signups().await }
    });

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, router(state)).await?;

    tracing::info!("Miala server stopped.");
    Ok(())
}
