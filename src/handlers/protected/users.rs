use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;

use crate::database::models::{FieldChange, ProfileUpdate, UserHistory, UserProfile};
use crate::error::ApiError;
use crate::handlers::validation::{json_body, require};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/users - The caller's account with its profile
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<UserProfile> {
    let profile = state
        .store
        .find_profile(auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user does not exist"))?;
    Ok(ApiResponse::success(profile))
}

/// PATCH /api/users - Change profile fields, logging each change to history
///
/// Accepts any of `name`, `age`, `gender`, `profileImage`; anything else is
/// rejected. An explicit `null` clears an optional field. Responds with the
/// list of fields that actually changed.
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Vec<FieldChange>> {
    let update = json_body(payload)?;
    if update.is_empty() {
        return Err(ApiError::validation("at least one profile field is required"));
    }
    if let Some(name) = &update.name {
        require("name", name.as_deref())?;
    }

    let changes = state.store.update_profile(auth_user.user_id, &update).await?;
    tracing::info!(user_id = auth_user.user_id, changed = changes.len(), "Profile updated");

    Ok(ApiResponse::success(changes).with_message("profile updated"))
}

/// GET /api/users/history - The caller's profile change log, newest first
pub async fn history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<UserHistory>> {
    let rows = state.store.list_history(auth_user.user_id).await?;
    Ok(ApiResponse::success(rows))
}
