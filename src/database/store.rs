use async_trait::async_trait;

use super::manager::DatabaseError;
use super::models::{
    Apply, ApplyView, Comment, FieldChange, NewApply, NewComment, NewPost, NewUser, Post,
    PostSummary, ProfileUpdate, User, UserHistory, UserInfo, UserProfile,
};

/// Everything the handlers need from the job board database.
///
/// Multi-statement writes (`create_user`, `update_profile`) are atomic:
/// either every row lands or none does.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    // Users
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, DatabaseError>;
    /// Insert the user and its profile in one transaction.
    async fn create_user(&self, new_user: NewUser) -> Result<(User, UserInfo), DatabaseError>;
    async fn find_profile(&self, user_id: i64) -> Result<Option<UserProfile>, DatabaseError>;
    /// Diff, update and append history in one transaction; returns the changes applied.
    async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<Vec<FieldChange>, DatabaseError>;
    async fn list_history(&self, user_id: i64) -> Result<Vec<UserHistory>, DatabaseError>;

    // Resumes, always scoped to their owner
    async fn create_apply(&self, new_apply: NewApply) -> Result<Apply, DatabaseError>;
    async fn list_applies(&self, user_id: i64) -> Result<Vec<ApplyView>, DatabaseError>;
    async fn find_apply(&self, user_id: i64, apply_id: i64) -> Result<Option<ApplyView>, DatabaseError>;
    async fn update_apply(
        &self,
        user_id: i64,
        apply_id: i64,
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Option<Apply>, DatabaseError>;
    async fn delete_apply(&self, user_id: i64, apply_id: i64) -> Result<Option<i64>, DatabaseError>;

    // Board posts and comments
    async fn create_post(&self, new_post: NewPost) -> Result<Post, DatabaseError>;
    async fn list_posts(&self) -> Result<Vec<PostSummary>, DatabaseError>;
    async fn find_post(&self, post_id: i64) -> Result<Option<Post>, DatabaseError>;
    async fn create_comment(&self, new_comment: NewComment) -> Result<Comment, DatabaseError>;
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, DatabaseError>;
}
