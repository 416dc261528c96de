pub mod auth;
pub mod swagger_main;
pub mod task;
pub mod user;

#[cfg(test)]
pub mod test_util;

use crate::{SharedData, logging};
use axum::Router;
use std::sync::Arc;

/// Assembles every route of the service, the API docs, and request tracing
pub fn build_router(shared_data: Arc<SharedData>) -> Router {
    let router = Router::new()
        .nest("/users", user::user_routes())
        .merge(task::task_routes())
        .merge(swagger_main::build_documentation())
        .with_state(shared_data);

    logging::attach_tracing_http(router)
}
