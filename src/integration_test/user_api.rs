use super::test_util::{TestDatabase, build_app, send};
use crate::api::test_util::{ReceivedErrorBody, deserialize_body};
use crate::dto;
use axum::http::StatusCode;
use serde_json::json;
use speculoos::prelude::*;
use tokio::task::JoinSet;

#[tokio::test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
async fn registers_and_logs_in() {
    let test_db = TestDatabase::create().await;
    let app = build_app(test_db.pool.clone());

    let register_response = send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "name": "João Silva", "login": "joao", "password": "SuaSenhaForte@123" })),
    )
    .await;
    assert_eq!(StatusCode::CREATED, register_response.status());
    let inserted: dto::InsertedUser = deserialize_body(register_response.into_body()).await;
    assert_that!(inserted.id).is_greater_than(0);

    let login_response = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "login": "joao", "password": "SuaSenhaForte@123" })),
    )
    .await;
    assert_eq!(StatusCode::OK, login_response.status());
    let token: dto::UserToken = deserialize_body(login_response.into_body()).await;
    assert_that!(token.token).is_not_equal_to(String::new());

    test_db.destroy().await;
}

#[tokio::test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
async fn rejects_duplicate_login_and_bad_password() {
    let test_db = TestDatabase::create().await;
    let app = build_app(test_db.pool.clone());
    let new_user = json!({ "name": "Maria", "login": "maria", "password": "segredo" });

    let first = send(&app, "POST", "/users", None, Some(new_user.clone())).await;
    assert_eq!(StatusCode::CREATED, first.status());

    let second = send(&app, "POST", "/users", None, Some(new_user)).await;
    assert_eq!(StatusCode::CONFLICT, second.status());
    let error: ReceivedErrorBody = deserialize_body(second.into_body()).await;
    assert_eq!("login_taken", error.error_code);

    let login_response = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "login": "maria", "password": "wrong" })),
    )
    .await;
    assert_eq!(StatusCode::UNAUTHORIZED, login_response.status());

    test_db.destroy().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
#[cfg_attr(not(feature = "integration_test"), ignore)]
async fn simultaneous_registrations_of_one_login_conflict() {
    let test_db = TestDatabase::create().await;
    let app = build_app(test_db.pool.clone());

    for round in 0..5 {
        let mut registrations = JoinSet::new();
        for _ in 0..3 {
            let app = app.clone();
            let new_user = json!({ "name": "Pedro", "login": format!("pedro{round}"), "password": "segredo" });
            registrations.spawn(async move {
                send(&app, "POST", "/users", None, Some(new_user))
                    .await
                    .status()
            });
        }

        let mut statuses = Vec::new();
        while let Some(status) = registrations.join_next().await {
            statuses.push(status.expect("registration task panicked"));
        }

        let created = statuses
            .iter()
            .filter(|status| **status == StatusCode::CREATED)
            .count();
        assert_eq!(1, created, "statuses were {statuses:?}");
        assert!(
            statuses
                .iter()
                .all(|status| *status == StatusCode::CREATED || *status == StatusCode::CONFLICT),
            "statuses were {statuses:?}"
        );
    }

    test_db.destroy().await;
}
