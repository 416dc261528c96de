use crate::app_env::test::TEST_DB_URL;
use crate::auth::{JwtTokenIssuer, PasswordScheme};
use crate::domain::task::TaskService;
use crate::{SharedData, api, persistence};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use chrono::FixedOffset;
use dotenv::dotenv;
use rand::Rng;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, PgPool};
use std::env;
use std::sync::Arc;
use tower::ServiceExt;

/// A freshly migrated database that only lives for the duration of one test
pub struct TestDatabase {
    base_url: String,
    db_name: String,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Creates a randomly named database on the server behind TEST_DB_URL and applies the migrations to it
    pub async fn create() -> Self {
        if dotenv().is_err() {
            println!("Test is running without .env file.");
        }
        let base_url = env::var(TEST_DB_URL).unwrap_or_else(|_| {
            panic!("You must provide the {TEST_DB_URL} environment variable as the base postgres connection string")
        });
        let db_name = format!("test_db_{}", rand::thread_rng().gen_range(10_000..99_999));

        let mut admin_cxn = PgConnection::connect(&format!("{base_url}/postgres"))
            .await
            .expect("Could not connect to provision the test database");
        sqlx::query(&format!("CREATE DATABASE {db_name}"))
            .execute(&mut admin_cxn)
            .await
            .expect("Could not create the test database");
        admin_cxn.close().await.ok();

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&format!("{base_url}/{db_name}"))
            .await
            .expect("Could not connect to the test database");
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("Migrations failed on the test database");

        TestDatabase {
            base_url,
            db_name,
            pool,
        }
    }

    /// Closes the pool and drops the database
    pub async fn destroy(self) {
        self.pool.close().await;

        let cleanup = async {
            let mut admin_cxn = PgConnection::connect(&format!("{}/postgres", self.base_url)).await?;
            sqlx::query(&format!("DROP DATABASE {}", self.db_name))
                .execute(&mut admin_cxn)
                .await?;
            admin_cxn.close().await
        };
        if let Err(error) = cleanup.await {
            println!(
                "Warning: failed to drop test database {}, you may need to do it manually. Error: {error}",
                self.db_name
            );
        }
    }
}

/// Wires the full application against the given database
pub fn build_app(db: PgPool) -> Router {
    let shared_data = SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(db),
        token_issuer: JwtTokenIssuer::new(
            "integration-secret",
            "orgatask-api",
            "orgatask-clients",
            60,
        ),
        password_scheme: PasswordScheme::Argon2,
        task_service: TaskService::new(
            FixedOffset::west_opt(3 * 3600).expect("offset should be valid"),
        ),
    };

    api::build_router(Arc::new(shared_data))
}

/// Sends a single request through the router, attaching a bearer token and JSON body when given
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::to_vec(&body).expect("body should serialize"),
            )),
        None => request.body(Body::empty()),
    }
    .expect("request should build");

    app.clone()
        .oneshot(request)
        .await
        .expect("router should always produce a response")
}
