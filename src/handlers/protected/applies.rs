use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Extension, Path, State,
};
use axum::Json;
use serde::Serialize;

use crate::database::models::{Apply, ApplyView, NewApply};
use crate::error::ApiError;
use crate::handlers::validation::{
    json_body, path_id, require, validate_resume_content, TitleContentRequest,
};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

const MISSING_RESUME: &str = "resume does not exist";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedApply {
    pub apply_id: i64,
}

/// POST /api/posts - Create a resume for the caller
pub async fn post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<TitleContentRequest>, JsonRejection>,
) -> ApiResult<Apply> {
    let request = json_body(payload)?;
    let (title, content) = request.require_both()?;
    validate_resume_content(content)?;

    let apply = state
        .store
        .create_apply(NewApply {
            user_id: auth_user.user_id,
            title: title.to_string(),
            content: content.to_string(),
        })
        .await?;

    tracing::info!(user_id = auth_user.user_id, apply_id = apply.apply_id, "Resume created");
    Ok(ApiResponse::created(apply))
}

/// GET /api/posts - The caller's resumes, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<ApplyView>> {
    let applies = state.store.list_applies(auth_user.user_id).await?;
    Ok(ApiResponse::success(applies))
}

/// GET /api/posts/:id - One of the caller's resumes, `{"data": null}` otherwise
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Option<ApplyView>> {
    let apply_id = path_id(path)?;
    let apply = state.store.find_apply(auth_user.user_id, apply_id).await?;
    Ok(ApiResponse::success(apply))
}

/// PATCH /api/posts/:id - Change the title and/or content of the caller's resume
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TitleContentRequest>, JsonRejection>,
) -> ApiResult<Apply> {
    let apply_id = path_id(path)?;
    let request = json_body(payload)?;
    if request.title.is_none() && request.content.is_none() {
        return Err(ApiError::validation("title or content is required"));
    }
    if request.title.is_some() {
        require("title", request.title.as_deref())?;
    }
    if let Some(content) = request.content.as_deref() {
        validate_resume_content(content)?;
    }

    let apply = state
        .store
        .update_apply(auth_user.user_id, apply_id, request.title, request.content)
        .await?
        .ok_or_else(|| ApiError::conflict(MISSING_RESUME))?;

    Ok(ApiResponse::success(apply))
}

/// DELETE /api/posts/:id - Remove one of the caller's resumes
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeletedApply> {
    let apply_id = path_id(path)?;
    let apply_id = state
        .store
        .delete_apply(auth_user.user_id, apply_id)
        .await?
        .ok_or_else(|| ApiError::conflict(MISSING_RESUME))?;

    tracing::info!(user_id = auth_user.user_id, apply_id, "Resume deleted");
    Ok(ApiResponse::success(DeletedApply { apply_id }))
}
