use crate::api::auth::AuthenticatedUser;
use crate::domain::task::StatusFilter;
use crate::domain::task::driving_ports::TaskPort;
use crate::external_connections::{ExternalConnectivity, TransactableExternalConnectivity};
use crate::routing_utils::{
    BasicErrorResponse, Json, Query, QueryErrorResponse, TaskErrorResponse,
    ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(
    create_task,
    update_task,
    delete_task,
    list_tasks,
    get_task,
    list_tasks_paged,
    status_summary,
    high_priority_tasks
))]
/// Defines the OpenAPI documentation for the task API
pub struct TaskApi;
/// Constant used to group task endpoints in OpenAPI documentation
pub const TASK_API_GROUP: &str = "Tasks";

/// Adds routes under "/tasks". Every route acts on the tasks of the caller identified by the
/// bearer token.
pub fn task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/tasks",
            get(async |State(app_state): AppState, user: AuthenticatedUser| {
                let mut ext_cxn = app_state.ext_cxn.clone();

                list_tasks(user.user_id, &mut ext_cxn, &app_state.task_service).await
            })
            .post(
                async |State(app_state): AppState,
                       user: AuthenticatedUser,
                       Query(classification): Query<dto::TaskClassification>,
                       Json(body): Json<dto::TaskBody>| {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    create_task(
                        user.user_id,
                        body,
                        classification,
                        &mut ext_cxn,
                        &app_state.task_service,
                    )
                    .await
                },
            ),
        )
        .route(
            "/tasks/paged",
            get(
                async |State(app_state): AppState,
                       user: AuthenticatedUser,
                       Query(pagination): Query<dto::PaginationQuery>| {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    list_tasks_paged(
                        user.user_id,
                        None,
                        pagination,
                        &mut ext_cxn,
                        &app_state.task_service,
                    )
                    .await
                },
            ),
        )
        .route(
            "/tasks/paged/:status",
            get(
                async |State(app_state): AppState,
                       user: AuthenticatedUser,
                       Path(status): Path<String>,
                       Query(pagination): Query<dto::PaginationQuery>| {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    list_tasks_paged(
                        user.user_id,
                        Some(status),
                        pagination,
                        &mut ext_cxn,
                        &app_state.task_service,
                    )
                    .await
                },
            ),
        )
        .route(
            "/tasks/status-summary",
            get(async |State(app_state): AppState, user: AuthenticatedUser| {
                let mut ext_cxn = app_state.ext_cxn.clone();

                status_summary(user.user_id, &mut ext_cxn, &app_state.task_service).await
            }),
        )
        .route(
            "/tasks/high-priority",
            get(async |State(app_state): AppState, user: AuthenticatedUser| {
                let mut ext_cxn = app_state.ext_cxn.clone();

                high_priority_tasks(user.user_id, &mut ext_cxn, &app_state.task_service).await
            }),
        )
        .route(
            "/tasks/:task_id",
            get(
                async |State(app_state): AppState,
                       user: AuthenticatedUser,
                       Path(task_id): Path<i32>| {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    get_task(user.user_id, task_id, &mut ext_cxn, &app_state.task_service).await
                },
            )
            .put(
                async |State(app_state): AppState,
                       user: AuthenticatedUser,
                       Path(task_id): Path<i32>,
                       Query(classification): Query<dto::TaskClassification>,
                       Json(body): Json<dto::TaskBody>| {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    update_task(
                        user.user_id,
                        task_id,
                        body,
                        classification,
                        &mut ext_cxn,
                        &app_state.task_service,
                    )
                    .await
                },
            )
            .delete(
                async |State(app_state): AppState,
                       user: AuthenticatedUser,
                       Path(task_id): Path<i32>| {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    delete_task(user.user_id, task_id, &mut ext_cxn, &app_state.task_service)
                        .await
                },
            ),
        )
}

/// Logs task failures worth a look. Missing and foreign tasks are ordinary client mistakes.
fn log_task_error(operation: &str, user_id: i32, task_err: &domain::task::driving_ports::TaskError) {
    match task_err {
        domain::task::driving_ports::TaskError::PortError(port_err) => {
            error!("Failed to {operation} for user {user_id}: {port_err:#}")
        }
        other => info!("Could not {operation} for user {user_id}: {other}"),
    }
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = TASK_API_GROUP,
    params(dto::TaskClassification),
    request_body = dto::TaskBody,
    security(("bearer_token" = [])),
    responses(
        (status = 201, description = "Task created", body = dto::InsertedTask),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Creates a task owned by the caller
async fn create_task(
    user_id: i32,
    body: dto::TaskBody,
    classification: dto::TaskClassification,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<(StatusCode, Json<dto::InsertedTask>), ErrorResponse> {
    info!("Adding task for user {user_id}");
    body.validate().map_err(ValidationErrorResponse::from)?;

    let task_write = persistence::db_task_driven_ports::DbTaskWriter;
    let new_task = dto::new_task(body, classification);

    let create_result = task_service
        .create_task(user_id, &new_task, ext_cxn, &task_write)
        .await;
    if let Err(ref task_err) = create_result {
        log_task_error("create task", user_id, task_err);
    }

    let task_id = create_result.map_err(TaskErrorResponse::from)?;
    Ok((StatusCode::CREATED, Json(dto::InsertedTask { id: task_id })))
}

#[utoipa::path(
    put,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(
        ("task_id" = i32, Path, description = "ID of the task to overwrite"),
        dto::TaskClassification,
    ),
    request_body = dto::TaskBody,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Task updated"),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Overwrites every editable field of a task the caller owns
async fn update_task(
    user_id: i32,
    task_id: i32,
    body: dto::TaskBody,
    classification: dto::TaskClassification,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<StatusCode, ErrorResponse> {
    info!("Updating task {task_id} for user {user_id}");
    body.validate().map_err(ValidationErrorResponse::from)?;

    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;
    let update = dto::update_task(body, classification);

    let update_result = task_service
        .update_task(user_id, task_id, &update, ext_cxn, &task_read, &task_write)
        .await;
    if let Err(ref task_err) = update_result {
        log_task_error("update task", user_id, task_err);
    }

    update_result.map_err(TaskErrorResponse::from)?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(("task_id" = i32, Path, description = "ID of the task to delete")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Task deleted"),
        (status = 401, response = BasicErrorResponse),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Deletes a task the caller owns
async fn delete_task(
    user_id: i32,
    task_id: i32,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<StatusCode, ErrorResponse> {
    info!("Deleting task {task_id} for user {user_id}");
    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;

    let delete_result = task_service
        .delete_task(user_id, task_id, ext_cxn, &task_read, &task_write)
        .await;
    if let Err(ref task_err) = delete_result {
        log_task_error("delete task", user_id, task_err);
    }

    delete_result.map_err(TaskErrorResponse::from)?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = TASK_API_GROUP,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Every task owned by the caller, newest first", body = Vec<dto::Task>),
        (status = 401, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists every task the caller owns
async fn list_tasks(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<Vec<dto::Task>>, ErrorResponse> {
    info!("Listing tasks for user {user_id}");
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let tasks_result = task_service
        .tasks_for_user(user_id, ext_cxn, &task_read)
        .await;
    if let Err(ref task_err) = tasks_result {
        log_task_error("list tasks", user_id, task_err);
    }

    let tasks = tasks_result.map_err(TaskErrorResponse::from)?;
    Ok(Json(tasks.into_iter().map(dto::Task::from).collect()))
}

#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(("task_id" = i32, Path, description = "ID of the task to fetch")),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "The requested task", body = dto::Task),
        (status = 401, response = BasicErrorResponse),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Retrieves one task the caller owns
async fn get_task(
    user_id: i32,
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::Task>, ErrorResponse> {
    info!("Get task {task_id} for user {user_id}");
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let task_result = task_service
        .task_by_id(user_id, task_id, ext_cxn, &task_read)
        .await;
    if let Err(ref task_err) = task_result {
        log_task_error("get task", user_id, task_err);
    }

    let task = task_result.map_err(TaskErrorResponse::from)?;
    Ok(Json(dto::Task::from(task)))
}

#[utoipa::path(
    get,
    path = "/tasks/paged/{status}",
    tag = TASK_API_GROUP,
    params(
        ("status" = Option<String>, Path, description = "Pendente, Em_Progresso, Concluído, or Todas for every status. The segment can be left off entirely."),
        dto::PaginationQuery,
    ),
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "One page of the caller's tasks, newest first", body = dto::TaskPage),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists one page of the caller's tasks, optionally restricted to one status
async fn list_tasks_paged(
    user_id: i32,
    status_filter: Option<String>,
    pagination: dto::PaginationQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::TaskPage>, ErrorResponse> {
    info!("Listing task page for user {user_id}: {pagination:?}, status {status_filter:?}");
    pagination
        .validate()
        .map_err(ValidationErrorResponse::from)?;

    let filter_text = status_filter.unwrap_or_default();
    let Some(filter) = StatusFilter::from_wire_str(&filter_text) else {
        return Err(QueryErrorResponse::new(format!(
            "unknown status filter \"{filter_text}\", expected Pendente, Em_Progresso, Concluído or Todas"
        ))
        .into());
    };

    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let page = domain::task::PageRequest::from(&pagination);
    let page_result = task_service
        .paged_tasks_for_user(user_id, &page, filter, ext_cxn, &task_read)
        .await;
    if let Err(ref task_err) = page_result {
        log_task_error("page tasks", user_id, task_err);
    }

    let task_page = page_result.map_err(TaskErrorResponse::from)?;
    Ok(Json(dto::TaskPage::from(task_page)))
}

#[utoipa::path(
    get,
    path = "/tasks/status-summary",
    tag = TASK_API_GROUP,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Task counts per status and the completed share", body = dto::StatusSummary),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Counts the caller's tasks per status
async fn status_summary(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::StatusSummary>, ErrorResponse> {
    info!("Summarizing task statuses for user {user_id}");
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let summary_result = task_service
        .status_summary(user_id, ext_cxn, &task_read)
        .await;
    if let Err(ref task_err) = summary_result {
        log_task_error("summarize tasks", user_id, task_err);
    }

    let summary = summary_result.map_err(TaskErrorResponse::from)?;
    Ok(Json(dto::StatusSummary::from(summary)))
}

#[utoipa::path(
    get,
    path = "/tasks/high-priority",
    tag = TASK_API_GROUP,
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Open high priority tasks, pending ones first", body = Vec<dto::HighPriorityTask>),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists the caller's unfinished high priority tasks with the days each has left
async fn high_priority_tasks(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<Vec<dto::HighPriorityTask>>, ErrorResponse> {
    info!("Listing open high priority tasks for user {user_id}");
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let high_priority_result = task_service
        .open_high_priority_tasks(user_id, ext_cxn, &task_read)
        .await;
    if let Err(ref task_err) = high_priority_result {
        log_task_error("list high priority tasks", user_id, task_err);
    }

    let tasks = high_priority_result.map_err(TaskErrorResponse::from)?;
    Ok(Json(
        tasks.into_iter().map(dto::HighPriorityTask::from).collect(),
    ))
}
