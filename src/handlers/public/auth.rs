use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::auth::{cookie, password, TokenKind};
use crate::database::models::user::DEFAULT_ROLE;
use crate::database::models::NewUser;
use crate::error::ApiError;
use crate::handlers::validation::{json_body, SignInRequest, SignUpRequest};
use crate::state::AppState;

/// Uniform answer for unknown email and wrong password alike.
const INVALID_CREDENTIALS: &str = "invalid credentials";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// POST /api/sign-up - Create an account and its profile
///
/// Expected Input:
/// ```json
/// { "email": "a@b.co", "password": "secret", "rePassword": "secret", "name": "A" }
/// ```
///
/// 201 with the identity fields; the password hash never leaves the store.
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let fields = request.validate()?;

    if state.store.find_user_by_email(fields.email).await?.is_some() {
        return Err(ApiError::conflict("email already registered"));
    }

    let password_hash = password::hash_password_blocking(fields.password.to_string()).await?;
    let (user, info) = state
        .store
        .create_user(NewUser {
            email: fields.email.to_string(),
            password_hash,
            name: fields.name.to_string(),
            role: DEFAULT_ROLE.to_string(),
        })
        .await?;

    tracing::info!(user_id = user.user_id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id: user.user_id,
            email: user.email,
            name: info.name,
            role: info.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }),
    ))
}

/// POST /api/sign-in - Exchange credentials for a session token
///
/// The token is returned as `{"AccessToken": ...}` and also set as the
/// `authorization` cookie the auth gate reads.
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let (email, candidate) = request.validate()?;

    let user = state.store.find_user_by_email(email).await?;

    // Unknown emails still pay for one argon2 verification
    let stored_hash = user
        .as_ref()
        .map_or_else(|| password::DUMMY_HASH.to_string(), |u| u.password.clone());
    let matches = password::verify_password_blocking(candidate.to_string(), stored_hash).await?;

    let user = match user {
        Some(user) if matches => user,
        Some(user) => {
            tracing::debug!(user_id = user.user_id, "Sign-in with wrong password");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
        None => {
            tracing::debug!("Sign-in for unknown email");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };

    let token = state.tokens.issue(TokenKind::Session, user.user_id)?;
    let cookie_value = cookie::set_cookie(
        cookie::AUTHORIZATION_COOKIE,
        &format!("Bearer%20{}", token),
        state.cookie_secure(),
    )
    .ok_or_else(|| ApiError::internal("session token is not a valid cookie value"))?;

    tracing::info!(user_id = user.user_id, "User signed in");

    Ok((
        [(header::SET_COOKIE, cookie_value)],
        Json(json!({ "AccessToken": token })),
    ))
}
