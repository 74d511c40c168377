use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{cookie, TokenKind, AUTH_FAILURE_MESSAGE};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, inserted into request extensions by the auth gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Reject the request unless it carries a valid session token for an
/// existing user. Every rejection looks the same to the client.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = cookie::bearer_from_request(request.headers()) else {
        tracing::debug!("No bearer token on request");
        return Err(ApiError::unauthorized(AUTH_FAILURE_MESSAGE));
    };

    let claims = state.tokens.verify(TokenKind::Session, token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        ApiError::unauthorized(AUTH_FAILURE_MESSAGE)
    })?;

    let user = state.store.find_user_by_id(claims.user_id).await?;
    let Some(user) = user else {
        tracing::debug!(user_id = claims.user_id, "Token for unknown user");
        return Err(ApiError::unauthorized(AUTH_FAILURE_MESSAGE));
    };

    request.extensions_mut().insert(AuthUser { user_id: user.user_id });
    Ok(next.run(request).await)
}
