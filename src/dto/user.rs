use crate::domain;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// DTO for registering a new user via the API
#[derive(Deserialize, Display, Validate, ToSchema)]
#[display("{name} ({login})")]
#[cfg_attr(test, derive(Serialize))]
pub struct NewUser {
    #[schema(example = "João Silva")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Stored trimmed and lowercased, and must fit in 50 characters in that form
    #[schema(example = "joao", max_length = 50)]
    #[validate(custom = "validate_normalized_login")]
    pub login: String,
    #[schema(example = "SuaSenhaForte@123")]
    #[validate(length(min = 1, max = 50))]
    pub password: String,
}

const MAX_LOGIN_CHARS: usize = 50;

/// Lowercasing can lengthen a login (`İ` becomes two characters), so the limit applies to the
/// form that gets stored
fn validate_normalized_login(login: &str) -> Result<(), ValidationError> {
    let stored_chars = domain::user::normalize_login(login).chars().count();
    if stored_chars == 0 || stored_chars > MAX_LOGIN_CHARS {
        return Err(ValidationError::new("length"));
    }

    Ok(())
}

impl From<NewUser> for domain::user::CreateUser {
    fn from(value: NewUser) -> Self {
        domain::user::CreateUser {
            name: value.name,
            login: value.login,
            password: value.password,
        }
    }
}

/// DTO for signing in
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct LoginRequest {
    #[schema(example = "joao")]
    #[validate(length(min = 1, max = 50))]
    pub login: String,
    #[schema(example = "SuaSenhaForte@123")]
    #[validate(length(min = 1, max = 50))]
    pub password: String,
}

impl From<LoginRequest> for domain::user::UserCredentials {
    fn from(value: LoginRequest) -> Self {
        domain::user::UserCredentials {
            login: value.login,
            password: value.password,
        }
    }
}

/// DTO containing the ID of a user that was created via the API.
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct InsertedUser {
    #[schema(example = 10)]
    pub id: i32,
}

/// Bearer token to send in the `Authorization` header of task requests
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct UserToken {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
}

impl From<domain::user::UserToken> for UserToken {
    fn from(value: domain::user::UserToken) -> Self {
        UserToken { token: value.token }
    }
}
