use crate::auth::PasswordScheme;
use anyhow::{Context, anyhow};
use chrono::FixedOffset;
use std::env;

/// URL for accessing the PostgreSQL database
pub const DB_URL: &str = "DATABASE_URL";
/// Address the HTTP server binds to
pub const SERVER_ADDRESS: &str = "SERVER_ADDRESS";
/// Log level configuration for the application, in [tracing_subscriber::EnvFilter] directive syntax
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// OpenTelemetry span export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

/// Symmetric key used to sign bearer tokens
pub const JWT_SECRET: &str = "JWT_SECRET";
pub const JWT_ISSUER: &str = "JWT_ISSUER";
pub const JWT_AUDIENCE: &str = "JWT_AUDIENCE";
/// Minutes a bearer token stays valid
pub const TOKEN_TTL_MINUTES: &str = "TOKEN_TTL_MINUTES";
/// Whole hours east of UTC used to stamp task creation times. Negative values are west of UTC.
pub const TASK_UTC_OFFSET_HOURS: &str = "TASK_UTC_OFFSET_HOURS";
/// Either "argon2" or "legacy-sha256"
pub const PASSWORD_SCHEME: &str = "PASSWORD_SCHEME";

const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_JWT_ISSUER: &str = "orgatask-api";
const DEFAULT_JWT_AUDIENCE: &str = "orgatask-clients";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;
const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

/// Settings read from the environment at startup
#[derive(Debug)]
pub struct AppConfig {
    pub db_url: String,
    pub server_address: String,
    /// Span and metric export URLs, present only when both are configured
    pub otel_endpoints: Option<(String, String)>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_minutes: i64,
    pub task_utc_offset: FixedOffset,
    pub password_scheme: PasswordScheme,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| anyhow!("the {key} environment variable must be set"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let token_ttl_minutes = match lookup(TOKEN_TTL_MINUTES) {
            Some(ttl) => ttl
                .parse::<i64>()
                .with_context(|| format!("{TOKEN_TTL_MINUTES} must be a whole number"))?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };
        if token_ttl_minutes <= 0 {
            return Err(anyhow!("{TOKEN_TTL_MINUTES} must be positive"));
        }

        let offset_hours = match lookup(TASK_UTC_OFFSET_HOURS) {
            Some(hours) => hours
                .parse::<i32>()
                .with_context(|| format!("{TASK_UTC_OFFSET_HOURS} must be a whole number"))?,
            None => DEFAULT_UTC_OFFSET_HOURS,
        };
        let task_utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| anyhow!("{TASK_UTC_OFFSET_HOURS} is out of range: {offset_hours}"))?;

        let password_scheme =
            PasswordScheme::from_env_value(&lookup(PASSWORD_SCHEME).unwrap_or_default())
                .with_context(|| format!("reading {PASSWORD_SCHEME}"))?;

        let otel_endpoints = match (lookup(OTEL_SPAN_EXPORT_URL), lookup(OTEL_METRIC_EXPORT_URL)) {
            (Some(spans), Some(metrics)) => Some((spans, metrics)),
            _ => None,
        };

        Ok(AppConfig {
            db_url: required(DB_URL)?,
            server_address: or_default(SERVER_ADDRESS, DEFAULT_SERVER_ADDRESS),
            otel_endpoints,
            jwt_secret: required(JWT_SECRET)?,
            jwt_issuer: or_default(JWT_ISSUER, DEFAULT_JWT_ISSUER),
            jwt_audience: or_default(JWT_AUDIENCE, DEFAULT_JWT_AUDIENCE),
            token_ttl_minutes,
            task_utc_offset,
            password_scheme,
        })
    }
}
