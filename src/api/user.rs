use crate::domain::user::driven_ports::{IssueToken, PasswordDigest};
use crate::domain::user::driving_ports::{RegisterUserError, UserPort};
use crate::external_connections::{ExternalConnectivity, TransactableExternalConnectivity};
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, LoginErrorResponse, RegisterUserErrorResponse,
    ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use anyhow::anyhow;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::post;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(register_user, login))]
/// Defines the OpenAPI documentation for the user API
pub struct UsersApi;
/// Constant used to group user endpoints in OpenAPI documentation
pub const USER_API_GROUP: &str = "Users";

/// Builds a router for all the user routes
pub fn user_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            post(
                async |State(app_state): AppState, Json(new_user): Json<dto::NewUser>| {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    register_user(
                        new_user,
                        &mut ext_cxn,
                        &user_service,
                        &app_state.password_scheme,
                    )
                    .await
                },
            ),
        )
        .route(
            "/login",
            post(
                async |State(app_state): AppState, Json(credentials): Json<dto::LoginRequest>| {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    login(
                        credentials,
                        &mut ext_cxn,
                        &user_service,
                        &app_state.password_scheme,
                        &app_state.token_issuer,
                    )
                    .await
                },
            ),
        )
}

#[utoipa::path(
    post,
    path = "/users",
    tag = USER_API_GROUP,
    request_body = dto::NewUser,
    responses(
        (status = 201, description = "User registered", body = dto::InsertedUser),
        (status = 400, response = BasicErrorResponse),
        (status = 409, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Registers a new account. Logins are unique regardless of case or surrounding whitespace.
async fn register_user(
    new_user: dto::NewUser,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    user_service: &impl UserPort,
    hasher: &impl PasswordDigest,
) -> Result<(StatusCode, Json<dto::InsertedUser>), ErrorResponse> {
    info!("Attempt to register user: {}", new_user);
    new_user
        .validate()
        .map_err(ValidationErrorResponse::from)?;

    let user_detect = persistence::db_user_driven_ports::DbDetectUser;
    let user_write = persistence::db_user_driven_ports::DbWriteUsers;
    let domain_user = domain::user::CreateUser::from(new_user);

    let registration_result = user_service
        .register(&domain_user, ext_cxn, &user_detect, &user_write, hasher)
        .await;
    match registration_result {
        Err(RegisterUserError::PortError(ref port_err)) => {
            error!("User registration failure: {port_err:#}")
        }
        Err(ref register_err) => info!("Registration refused: {register_err}"),
        Ok(_) => {}
    }

    let user_id = registration_result.map_err(RegisterUserErrorResponse::from)?;
    Ok((StatusCode::CREATED, Json(dto::InsertedUser { id: user_id })))
}

#[utoipa::path(
    post,
    path = "/users/login",
    tag = USER_API_GROUP,
    request_body = dto::LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = dto::UserToken),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Checks a login and password and hands back a bearer token for the task routes
async fn login(
    credentials: dto::LoginRequest,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
    hasher: &impl PasswordDigest,
    token_issuer: &impl IssueToken,
) -> Result<Json<dto::UserToken>, ErrorResponse> {
    credentials
        .validate()
        .map_err(ValidationErrorResponse::from)?;
    info!("Login attempt for {}", credentials.login);

    let user_read = persistence::db_user_driven_ports::DbReadUsers;
    let domain_credentials = domain::user::UserCredentials::from(credentials);

    user_service
        .verify_credentials(&domain_credentials, &mut *ext_cxn, &user_read, hasher)
        .await
        .map_err(LoginErrorResponse::from)?;

    let user_id = user_service
        .find_user_id(&domain_credentials.login, &mut *ext_cxn, &user_read)
        .await
        .map_err(|lookup_err| {
            error!("Could not look up id of verified user: {lookup_err}");
            GenericErrorResponse(lookup_err)
        })?;
    if user_id == 0 {
        error!("Verified login {} has no user id", domain_credentials.login);
        return Err(GenericErrorResponse(anyhow!("verified login has no id")).into());
    }

    let token = user_service
        .issue_token(user_id, &domain_credentials.login, token_issuer)
        .map_err(|token_err| {
            error!("Could not issue token: {token_err}");
            GenericErrorResponse(token_err)
        })?;

    Ok(Json(dto::UserToken::from(token)))
}
