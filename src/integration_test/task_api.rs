use super::test_util::{TestDatabase, build_app, send};
use crate::api::test_util::{ReceivedErrorBody, deserialize_body};
use crate::dto;
use axum::Router;
use axum::http::StatusCode;
use serde_json::json;
use speculoos::prelude::*;

async fn register_and_login(app: &Router, login: &str) -> String {
    let register_response = send(
        app,
        "POST",
        "/users",
        None,
        Some(json!({ "name": login, "login": login, "password": "SuaSenhaForte@123" })),
    )
    .await;
    assert_eq!(StatusCode::CREATED, register_response.status());

    let login_response = send(
        app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "login": login, "password": "SuaSenhaForte@123" })),
    )
    .await;
    assert_eq!(StatusCode::OK, login_response.status());
    let token: dto::UserToken = deserialize_body(login_response.into_body()).await;

    token.token
}

async fn create_task(app: &Router, token: &str, title: &str, priority: &str, status: &str) -> i32 {
    let response = send(
        app,
        "POST",
        &format!("/tasks?priority={priority}&status={status}"),
        Some(token),
        Some(json!({ "title": title, "description": "Desenvolver endpoints", "deadline": 5 })),
    )
    .await;
    assert_eq!(StatusCode::CREATED, response.status());
    let inserted: dto::InsertedTask = deserialize_body(response.into_body()).await;

    inserted.id
}

#[tokio::test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
async fn owner_manages_tasks_and_others_are_refused() {
    let test_db = TestDatabase::create().await;
    let app = build_app(test_db.pool.clone());
    let owner_token = register_and_login(&app, "ana").await;
    let other_token = register_and_login(&app, "bruno").await;

    let empty_list = send(&app, "GET", "/tasks", Some(&owner_token), None).await;
    assert_eq!(StatusCode::NOT_FOUND, empty_list.status());

    let task_id = create_task(&app, &owner_token, "Implementar API", "Alta", "Pendente").await;

    let list_response = send(&app, "GET", "/tasks", Some(&owner_token), None).await;
    assert_eq!(StatusCode::OK, list_response.status());
    let tasks: Vec<dto::Task> = deserialize_body(list_response.into_body()).await;
    assert_that!(tasks).has_length(1);
    assert_eq!(task_id, tasks[0].id);
    assert_eq!(dto::TaskPriority::High, tasks[0].priority);
    assert_eq!(dto::TaskStatus::Pending, tasks[0].status);
    assert_that!(tasks[0].created_at.as_str()).ends_with("-03:00");

    let foreign_delete = send(
        &app,
        "DELETE",
        &format!("/tasks/{task_id}"),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::FORBIDDEN, foreign_delete.status());
    let error: ReceivedErrorBody = deserialize_body(foreign_delete.into_body()).await;
    assert_eq!("forbidden", error.error_code);

    let update_response = send(
        &app,
        "PUT",
        &format!("/tasks/{task_id}?priority=Baixa&status=Em_Progresso"),
        Some(&owner_token),
        Some(json!({ "title": "Revisar API", "description": "Revisar endpoints", "deadline": 7 })),
    )
    .await;
    assert_eq!(StatusCode::OK, update_response.status());

    let get_response = send(
        &app,
        "GET",
        &format!("/tasks/{task_id}"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, get_response.status());
    let task: dto::Task = deserialize_body(get_response.into_body()).await;
    assert_eq!("Revisar API", task.title);
    assert_eq!(7, task.deadline);
    assert_eq!(dto::TaskStatus::InProgress, task.status);

    let delete_response = send(
        &app,
        "DELETE",
        &format!("/tasks/{task_id}"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, delete_response.status());

    let missing_response = send(
        &app,
        "GET",
        &format!("/tasks/{task_id}"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(StatusCode::NOT_FOUND, missing_response.status());

    test_db.destroy().await;
}

#[tokio::test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
async fn pages_summarizes_and_lists_high_priority() {
    let test_db = TestDatabase::create().await;
    let app = build_app(test_db.pool.clone());
    let token = register_and_login(&app, "carla").await;

    let first = create_task(&app, &token, "Primeira", "Alta", "Pendente").await;
    create_task(&app, &token, "Segunda", "Baixa", "Pendente").await;
    let third = create_task(&app, &token, "Terceira", "Alta", "Em_Progresso").await;
    create_task(&app, &token, "Quarta", "Alta", "Conclu%C3%ADdo").await;

    let page_response = send(
        &app,
        "GET",
        "/tasks/paged?page_number=1&page_size=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(StatusCode::OK, page_response.status());
    let page: dto::TaskPage = deserialize_body(page_response.into_body()).await;
    assert_eq!(4, page.total_count);
    assert_that!(page.items).has_length(2);
    assert_eq!("Quarta", page.items[0].title);

    let filtered_response = send(
        &app,
        "GET",
        "/tasks/paged/Pendente?page_number=1&page_size=10",
        Some(&token),
        None,
    )
    .await;
    let filtered: dto::TaskPage = deserialize_body(filtered_response.into_body()).await;
    assert_eq!(2, filtered.total_count);

    let summary_response = send(&app, "GET", "/tasks/status-summary", Some(&token), None).await;
    assert_eq!(StatusCode::OK, summary_response.status());
    let summary: dto::StatusSummary = deserialize_body(summary_response.into_body()).await;
    assert_eq!(2, summary.pending);
    assert_eq!(1, summary.in_progress);
    assert_eq!(1, summary.completed);
    assert_eq!(25.0, summary.completion_percentage);

    let high_priority_response =
        send(&app, "GET", "/tasks/high-priority", Some(&token), None).await;
    assert_eq!(StatusCode::OK, high_priority_response.status());
    let high_priority: Vec<dto::HighPriorityTask> =
        deserialize_body(high_priority_response.into_body()).await;
    let ids: Vec<i32> = high_priority.iter().map(|task| task.id).collect();
    assert_eq!(vec![first, third], ids);
    assert_eq!(5, high_priority[0].days_remaining);

    test_db.destroy().await;
}
