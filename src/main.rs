mod auth;
mod config;
mod entities;
mod error;
mod fulfillment;
mod http;
mod intake;
mod ledger;
mod listing;
mod models;
mod notify;
mod repository;
mod state;
mod storage;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::StaticTokenAuthorizer;
use crate::config::ApiConfig;
use crate::fulfillment::FulfillmentService;
use crate::intake::IntakeService;
use crate::ledger::SeaOrmLedger;
use crate::listing::RequestListing;
use crate::notify::NotificationComposer;
use crate::repository::SeaOrmRequestStore;
use crate::state::AppState;
use crate::storage::LocalObjectStore;
use anyhow::{Context, Result};
use axum::Router;
use migration::MigratorTrait;
use sea_orm::ConnectOptions;
use sea_orm::Database;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ApiConfig::load().context("Failed to load configuration")?;
    let database = Arc::new(connect_database(&config).await?);
    run_migrations(&database).await?;

    let ledger = Arc::new(SeaOrmLedger::new(Arc::clone(&database), &config.cache));
    let requests = Arc::new(SeaOrmRequestStore::new(database));
    let proofs = Arc::new(LocalObjectStore::new(
        &config.storage.proof_dir,
        &config.storage.public_base_url,
    ));
    info!("Payment proofs stored under {}", proofs.root().display());

    if config.admin.tokens.is_empty() {
        warn!("No admin tokens configured; admin endpoints will refuse every caller");
    }
    let authorizer = Arc::new(StaticTokenAuthorizer::new(config.admin.tokens.iter()));

    let intake = Arc::new(IntakeService::new(
        ledger,
        requests.clone(),
        proofs,
        config.intake.clone(),
    ));
    let fulfillment = Arc::new(FulfillmentService::new(
        requests.clone(),
        authorizer.clone(),
    ));
    let listing = Arc::new(RequestListing::new(requests.clone(), authorizer));
    let notifier = Arc::new(
        NotificationComposer::new(&config.notification.admin_contact)
            .context("Invalid notification admin contact")?,
    );
    let app_state = AppState::new(intake, fulfillment, listing, notifier, requests);

    let listener = TcpListener::bind(config.server.address())
        .await
        .context("Failed to bind HTTP listener")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to obtain listener address")?;
    info!("Credits API listening on {local_addr}");

    let router: Router = http::router(app_state, Some(&config.storage));
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited with error")?;

    info!("Credits API stopped");
    Ok(())
}

fn init_tracing() {
    let default_filter = "info";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false);
    if std::env::var("CREDITS_API_LOG_JSON").is_ok_and(|value| value == "1") {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn connect_database(config: &ApiConfig) -> Result<sea_orm::DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database.url.clone());
    options
        .max_connections(config.database.max_connections)
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug)
        .acquire_timeout(Duration::from_secs(10));

    if let Some(min) = config.database.min_connections {
        options.min_connections(min);
    }

    Database::connect(options)
        .await
        .context("Failed to connect to PostgreSQL")
}

async fn run_migrations(database: &sea_orm::DatabaseConnection) -> Result<()> {
    migration::Migrator::up(database, None)
        .await
        .context("Database migrations failed")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}
