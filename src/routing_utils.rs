use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_macros::{FromRequest, FromRequestParts};

use serde::Serialize;
use utoipa::openapi::{RefOr, Schema};
use utoipa::{ToResponse, ToSchema, openapi};

use validator::ValidationErrors;

use crate::domain::task::driving_ports::TaskError;
use crate::domain::user::driving_ports::{LoginError, RegisterUserError};

/// Contains diagnostic information about an API failure
#[derive(Serialize, Debug, ToResponse)]
#[response(examples(
    ("Not Found" = (
        summary = "Task could not be found (404)",
        value = json!({
            "error_code": "not_found",
            "error_description": "The requested task does not exist.",
            "extra_info": null
        })
    )),

    ("Forbidden" = (
        summary = "Task belongs to someone else (403)",
        value = json!({
            "error_code": "forbidden",
            "error_description": "Operation not allowed: the task does not belong to the current user.",
            "extra_info": null
        })
    )),

    ("Unauthorized" = (
        summary = "Missing or invalid bearer token, or bad credentials (401)",
        value = json!({
            "error_code": "unauthorized",
            "error_description": "A valid bearer token is required.",
            "extra_info": "missing Authorization header"
        })
    )),

    ("Conflict" = (
        summary = "Login already registered (409)",
        value = json!({
            "error_code": "login_taken",
            "error_description": "The provided login is already registered.",
            "extra_info": null
        })
    )),

    ("Internal Failure" = (
        summary = "Something unexpected went wrong inside the server (500)",
        value = json!({
            "error_code": "internal_error",
            "error_description": "Could not access data to complete your request",
            "extra_info": null
        })
    )),

    ("Invalid Input" = (
        summary = "Invalid request body was passed (400)",
        value = json!({
            "error_code": "invalid_input",
            "error_description": "Submitted data was invalid.",
            "extra_info": {
                "deadline": [
                    {
                        "code": "range",
                        "message": null,
                        "params": {
                            "value": 1000,
                            "min": 1.0,
                            "max": 999.0
                        }
                    }
                ]
            }
        })
    )),

    ("Malformed JSON" = (
        summary = "Invalid JSON passed to server (400)",
        value = json!({
            "error_code": "invalid_json",
            "error_description": "The passed request body contained malformed or unreadable JSON.",
            "extra_info": "Failed to parse the request body as JSON: EOF while parsing an object at line 4 column 0"
        })
    )),

    ("Malformed Query" = (
        summary = "Query string could not be read (400)",
        value = json!({
            "error_code": "invalid_query",
            "error_description": "The query string was missing values or contained unreadable ones.",
            "extra_info": "Failed to deserialize query string: unknown variant `Urgente`, expected one of `Alta`, `Média`, `Baixa`"
        })
    ))
))]
pub struct BasicErrorResponse {
    pub error_code: String,
    pub error_description: String,
    pub extra_info: Option<ExtraInfo>,
}

impl BasicErrorResponse {
    fn without_info(error_code: &str, error_description: &str) -> Self {
        BasicErrorResponse {
            error_code: error_code.to_owned(),
            error_description: error_description.to_owned(),
            extra_info: None,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(untagged)]
pub enum ExtraInfo {
    ValidationIssues(ValidationErrorSchema),
    Message(String),
}

/// Stand-in OpenAPI schema for [ValidationErrors] which just provides an empty object
#[derive(Serialize, Debug)]
#[serde(transparent)]
pub struct ValidationErrorSchema(ValidationErrors);

impl<'schem> ToSchema<'schem> for ValidationErrorSchema {
    fn schema() -> (&'schem str, RefOr<Schema>) {
        (
            "ValidationErrorSchema",
            openapi::ObjectBuilder::new().into(),
        )
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(BasicErrorResponse::without_info(
            "internal_error",
            "Could not access data to complete your request",
        )),
    )
        .into_response()
}

/// Response type for unexpected failures. Details are logged where the failure is caught and
/// never sent to the client.
pub struct GenericErrorResponse(pub anyhow::Error);

impl IntoResponse for GenericErrorResponse {
    fn into_response(self) -> Response {
        internal_error()
    }
}

/// Response type that wraps task failures and turns them into [BasicErrorResponse]s
pub struct TaskErrorResponse(TaskError);

impl From<TaskError> for TaskErrorResponse {
    fn from(value: TaskError) -> Self {
        Self(value)
    }
}

impl IntoResponse for TaskErrorResponse {
    fn into_response(self) -> Response {
        let description = self.0.to_string();
        match self.0 {
            TaskError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(BasicErrorResponse::without_info("not_found", &description)),
            )
                .into_response(),
            TaskError::NotOwnedByUser => (
                StatusCode::FORBIDDEN,
                Json(BasicErrorResponse::without_info("forbidden", &description)),
            )
                .into_response(),
            TaskError::PortError(_) => internal_error(),
        }
    }
}

/// Response type for failed registrations
pub struct RegisterUserErrorResponse(RegisterUserError);

impl From<RegisterUserError> for RegisterUserErrorResponse {
    fn from(value: RegisterUserError) -> Self {
        Self(value)
    }
}

impl IntoResponse for RegisterUserErrorResponse {
    fn into_response(self) -> Response {
        match self.0 {
            RegisterUserError::LoginAlreadyExists => (
                StatusCode::CONFLICT,
                Json(BasicErrorResponse::without_info(
                    "login_taken",
                    &RegisterUserError::LoginAlreadyExists.to_string(),
                )),
            )
                .into_response(),
            RegisterUserError::PortError(_) => internal_error(),
        }
    }
}

/// Response type for failed sign-ins
pub struct LoginErrorResponse(LoginError);

impl From<LoginError> for LoginErrorResponse {
    fn from(value: LoginError) -> Self {
        Self(value)
    }
}

impl IntoResponse for LoginErrorResponse {
    fn into_response(self) -> Response {
        match self.0 {
            LoginError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(BasicErrorResponse::without_info(
                    "unauthorized",
                    &LoginError::InvalidCredentials.to_string(),
                )),
            )
                .into_response(),
            LoginError::PortError(_) => internal_error(),
        }
    }
}

/// Response type for requests without a usable bearer token
#[derive(Debug)]
pub struct UnauthorizedResponse {
    pub reason: String,
}

impl IntoResponse for UnauthorizedResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(BasicErrorResponse {
                error_code: "unauthorized".into(),
                error_description: "A valid bearer token is required.".into(),
                extra_info: Some(ExtraInfo::Message(self.reason)),
            }),
        )
            .into_response()
    }
}

/// Response type that wraps validation errors and turns them into [BasicErrorResponse]s
pub struct ValidationErrorResponse(ValidationErrors);

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(BasicErrorResponse {
                error_code: "invalid_input".into(),
                error_description: "Submitted data was invalid.".to_owned(),
                extra_info: Some(ExtraInfo::ValidationIssues(ValidationErrorSchema(self.0))),
            }),
        )
            .into_response()
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(BasicErrorResponse {
                error_code: "invalid_json".into(),
                error_description:
                    "The passed request body contained malformed or unreadable JSON.".into(),
                extra_info: Some(ExtraInfo::Message(self.parse_problem)),
            }),
        )
            .into_response()
    }
}

/// Wrapper for [axum::extract::Query] which reports unreadable query strings with our
/// error body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(QueryErrorResponse))]
pub struct Query<T>(pub T);

/// Response type representing query string parse errors
pub struct QueryErrorResponse {
    parse_problem: String,
}

impl QueryErrorResponse {
    pub fn new(parse_problem: impl Into<String>) -> Self {
        QueryErrorResponse {
            parse_problem: parse_problem.into(),
        }
    }
}

impl From<QueryRejection> for QueryErrorResponse {
    fn from(value: QueryRejection) -> Self {
        Self::new(value.body_text())
    }
}

impl IntoResponse for QueryErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(BasicErrorResponse {
                error_code: "invalid_query".into(),
                error_description:
                    "The query string was missing values or contained unreadable ones.".into(),
                extra_info: Some(ExtraInfo::Message(self.parse_problem)),
            }),
        )
            .into_response()
    }
}
