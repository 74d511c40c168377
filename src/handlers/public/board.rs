use axum::extract::{rejection::PathRejection, Path, State};

use crate::database::models::{Comment, Post, PostSummary};
use crate::error::ApiError;
use crate::handlers::validation::path_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/board/posts - Every post, newest first, without bodies
pub async fn posts_list(State(state): State<AppState>) -> ApiResult<Vec<PostSummary>> {
    let posts = state.store.list_posts().await?;
    Ok(ApiResponse::success(posts))
}

/// GET /api/board/posts/:id - One post, `{"data": null}` when missing
pub async fn post_get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Option<Post>> {
    let post_id = path_id(path)?;
    let post = state.store.find_post(post_id).await?;
    Ok(ApiResponse::success(post))
}

/// GET /api/posts/:id/comments - Comments on a post, newest first
pub async fn comments_list(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Vec<Comment>> {
    let post_id = path_id(path)?;
    if state.store.find_post(post_id).await?.is_none() {
        return Err(ApiError::not_found("post does not exist"));
    }

    let comments = state.store.list_comments(post_id).await?;
    Ok(ApiResponse::success(comments))
}
