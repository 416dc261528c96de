use crate::app_env::AppConfig;
use crate::auth::{JwtTokenIssuer, PasswordScheme};
use crate::domain::task::TaskService;
use anyhow::Context;
use axum::extract::State;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod api;
mod app_env;
mod auth;
mod domain;
mod dto;
mod external_connections;
mod logging;
mod persistence;
mod routing_utils;

/// Everything the request handlers need to reach the outside world
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub token_issuer: JwtTokenIssuer,
    pub password_scheme: PasswordScheme,
    pub task_service: TaskService,
}

pub type AppState = State<Arc<SharedData>>;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let dotenv_result = dotenv();
    let config = AppConfig::from_env()?;

    let otel_exporters = match &config.otel_endpoints {
        Some((spans_url, metrics_url)) => Some(logging::init_exporters(spans_url, metrics_url)?),
        None => None,
    };
    logging::setup_logging_and_tracing(logging::init_env_filter()?, otel_exporters);

    if dotenv_result.is_err() {
        info!("Running without a .env file.");
    }
    if config.password_scheme == PasswordScheme::LegacySha256 {
        warn!("Passwords are digested with unsalted SHA-256. Switch PASSWORD_SCHEME to argon2 once old accounts are migrated.");
    }

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.db_url)
        .await
        .context("connecting to the database")?;
    sqlx::migrate!()
        .run(&db)
        .await
        .context("running database migrations")?;

    let shared_data = Arc::new(SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(db),
        token_issuer: JwtTokenIssuer::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            &config.jwt_audience,
            config.token_ttl_minutes,
        ),
        password_scheme: config.password_scheme,
        task_service: TaskService::new(config.task_utc_offset),
    });

    let listener = TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("binding to {}", config.server_address))?;
    info!("Starting server on {}", config.server_address);

    axum::serve(listener, api::build_router(shared_data))
        .await
        .context("serving requests")
}
