//! Request and response bodies exchanged over the HTTP API, along with their mappings to and
//! from domain types

mod task;
mod user;

pub use task::*;
pub use user::*;

use crate::routing_utils::{BasicErrorResponse, ExtraInfo, ValidationErrorSchema};
use utoipa::OpenApi;

/// Schemas which aren't picked up automatically from route annotations
#[derive(OpenApi)]
#[openapi(components(
    schemas(
        NewUser,
        LoginRequest,
        InsertedUser,
        UserToken,
        TaskPriority,
        TaskStatus,
        TaskBody,
        InsertedTask,
        Task,
        TaskPage,
        StatusSummary,
        HighPriorityTask,
        ExtraInfo,
        ValidationErrorSchema,
    ),
    responses(BasicErrorResponse)
))]
pub struct OpenApiSchemas;
