use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Extension, Path, State,
};
use axum::Json;
use serde::Deserialize;

use crate::database::models::{Comment, NewComment, NewPost, Post};
use crate::error::ApiError;
use crate::handlers::validation::{json_body, path_id, require, TitleContentRequest};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

/// POST /api/board/posts - Publish a board post
pub async fn post_create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<TitleContentRequest>, JsonRejection>,
) -> ApiResult<Post> {
    let request = json_body(payload)?;
    let (title, content) = request.require_both()?;

    let post = state
        .store
        .create_post(NewPost {
            user_id: auth_user.user_id,
            title: title.to_string(),
            content: content.to_string(),
        })
        .await?;

    Ok(ApiResponse::created(post))
}

/// POST /api/posts/:id/comments - Comment on an existing board post
pub async fn comment_create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<Comment> {
    let post_id = path_id(path)?;
    if state.store.find_post(post_id).await?.is_none() {
        return Err(ApiError::not_found("post does not exist"));
    }

    let request = json_body(payload)?;
    let content = require("content", request.content.as_deref())?;

    let comment = state
        .store
        .create_comment(NewComment {
            user_id: auth_user.user_id,
            post_id,
            content: content.to_string(),
        })
        .await?;

    Ok(ApiResponse::created(comment))
}
