use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod jwt;
mod middleware;
mod models;
mod peers;
mod refresh;
mod repositories;
mod routes;
mod services;
mod validation;

use common::database;
use sqlx::migrate::Migrator;

use crate::{
    config::Config,
    jwt::JwtService,
    peers::Peers,
    refresh::OpaqueTokenCodec,
    repositories::PgSessionStore,
    services::{IdentityService, SessionService},
};

static MIGRATOR: Migrator = sqlx::migrate!();

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub identities: IdentityService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    let config = Config::from_env()?;

    // Initialize database connection pool
    let pool = database::init_pool(&config.database).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool, &MIGRATOR).await?;

    let jwt_service = JwtService::new(config.jwt.clone())?;
    let peers = Peers::connect(&config.peers)?;

    let sessions = SessionService::new(
        Arc::new(PgSessionStore::new(pool)),
        Arc::new(OpaqueTokenCodec),
        Arc::new(jwt_service),
        &config.session,
    );
    let identities = IdentityService::new(
        sessions.clone(),
        Arc::new(peers.code),
        Arc::new(peers.users),
        Arc::new(peers.email),
    );

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(AppState {
        sessions,
        identities,
    });

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!("Authentication service listening on {}", config.server.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Authentication service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
