use crate::SharedData;
use crate::auth::JwtTokenIssuer;
use crate::routing_utils::UnauthorizedResponse;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;
use tracing::info;

/// The caller of a task route, as identified by their bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub login: String,
}

/// Reads and validates the bearer token in the `Authorization` header
pub fn authenticate(
    headers: &HeaderMap,
    token_issuer: &JwtTokenIssuer,
) -> Result<AuthenticatedUser, UnauthorizedResponse> {
    let Some(header_value) = headers.get(AUTHORIZATION) else {
        return Err(UnauthorizedResponse {
            reason: "missing Authorization header".to_owned(),
        });
    };

    let token = header_value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| UnauthorizedResponse {
            reason: "Authorization header must hold a bearer token".to_owned(),
        })?;

    match token_issuer.decode(token) {
        Ok(claims) => Ok(AuthenticatedUser {
            user_id: claims.user_id,
            login: claims.sub,
        }),
        Err(decode_err) => {
            info!("Rejected bearer token: {decode_err:#}");
            Err(UnauthorizedResponse {
                reason: "bearer token is invalid or expired".to_owned(),
            })
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<SharedData>> for AuthenticatedUser {
    type Rejection = UnauthorizedResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<SharedData>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, &state.token_issuer)
    }
}
