use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{
    Apply, ApplyState, ApplyView, Comment, FieldChange, NewApply, NewComment, NewPost, NewUser,
    Post, PostSummary, ProfileInfo, ProfileUpdate, User, UserHistory, UserInfo, UserProfile,
};
use super::store::Store;

/// Postgres SQLSTATE for foreign_key_violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

const USER_COLUMNS: &str = "user_id, email, password, created_at, updated_at";
const USER_INFO_COLUMNS: &str = "user_id, name, role, age, gender, profile_image, created_at, updated_at";
const APPLY_COLUMNS: &str = "apply_id, user_id, title, content, state, created_at, updated_at";
const APPLY_VIEW_SELECT: &str = "SELECT a.apply_id, a.user_id, i.name, a.title, a.content, a.state, a.created_at, a.updated_at
     FROM applies a
     JOIN user_infos i ON i.user_id = a.user_id";
const POST_COLUMNS: &str = "post_id, user_id, title, content, created_at, updated_at";
const COMMENT_COLUMNS: &str = "comment_id, user_id, post_id, content, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: i64,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    name: String,
    role: String,
    age: Option<i32>,
    gender: Option<String>,
    profile_image: Option<String>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user_infos: ProfileInfo {
                name: row.name,
                role: row.role,
                age: row.age,
                gender: row.gender,
                profile_image: row.profile_image,
            },
        }
    }
}

/// sqlx-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Begin a transaction pinned to READ COMMITTED.
    async fn begin_read_committed(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<(User, UserInfo), DatabaseError> {
        let mut tx = self.begin_read_committed().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DatabaseError::conflict_on_unique(e, "email already registered"))?;

        let info = sqlx::query_as::<_, UserInfo>(&format!(
            "INSERT INTO user_infos (user_id, name, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_INFO_COLUMNS
        ))
        .bind(user.user_id)
        .bind(&new_user.name)
        .bind(&new_user.role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((user, info))
    }

    async fn find_profile(&self, user_id: i64) -> Result<Option<UserProfile>, DatabaseError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT u.user_id, u.email, u.created_at, u.updated_at,
                    i.name, i.role, i.age, i.gender, i.profile_image
             FROM users u
             JOIN user_infos i ON i.user_id = u.user_id
             WHERE u.user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserProfile::from))
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<Vec<FieldChange>, DatabaseError> {
        let mut tx = self.begin_read_committed().await?;

        let mut info = sqlx::query_as::<_, UserInfo>(&format!(
            "SELECT {} FROM user_infos WHERE user_id = $1 FOR UPDATE",
            USER_INFO_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("profile not found".to_string()))?;

        let changes = info.apply_update(update);
        if changes.is_empty() {
            tx.commit().await?;
            return Ok(changes);
        }

        sqlx::query(
            "UPDATE user_infos
             SET name = $2, age = $3, gender = $4, profile_image = $5, updated_at = NOW()
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(&info.name)
        .bind(info.age)
        .bind(&info.gender)
        .bind(&info.profile_image)
        .execute(&mut *tx)
        .await?;

        for change in &changes {
            sqlx::query(
                "INSERT INTO user_histories (user_id, changed_field, old_value, new_value)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(user_id)
            .bind(&change.changed_field)
            .bind(&change.old_value)
            .bind(&change.new_value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(changes)
    }

    async fn list_history(&self, user_id: i64) -> Result<Vec<UserHistory>, DatabaseError> {
        let rows = sqlx::query_as::<_, UserHistory>(
            "SELECT user_history_id, user_id, changed_field, old_value, new_value, changed_at
             FROM user_histories
             WHERE user_id = $1
             ORDER BY changed_at DESC, user_history_id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_apply(&self, new_apply: NewApply) -> Result<Apply, DatabaseError> {
        let apply = sqlx::query_as::<_, Apply>(&format!(
            "INSERT INTO applies (user_id, title, content, state) VALUES ($1, $2, $3, $4) RETURNING {}",
            APPLY_COLUMNS
        ))
        .bind(new_apply.user_id)
        .bind(&new_apply.title)
        .bind(&new_apply.content)
        .bind(ApplyState::Apply.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(apply)
    }

    async fn list_applies(&self, user_id: i64) -> Result<Vec<ApplyView>, DatabaseError> {
        let rows = sqlx::query_as::<_, ApplyView>(&format!(
            "{} WHERE a.user_id = $1 ORDER BY a.created_at DESC, a.apply_id DESC",
            APPLY_VIEW_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_apply(&self, user_id: i64, apply_id: i64) -> Result<Option<ApplyView>, DatabaseError> {
        let row = sqlx::query_as::<_, ApplyView>(&format!(
            "{} WHERE a.user_id = $1 AND a.apply_id = $2",
            APPLY_VIEW_SELECT
        ))
        .bind(user_id)
        .bind(apply_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_apply(
        &self,
        user_id: i64,
        apply_id: i64,
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Option<Apply>, DatabaseError> {
        let apply = sqlx::query_as::<_, Apply>(&format!(
            "UPDATE applies
             SET title = COALESCE($3, title), content = COALESCE($4, content), updated_at = NOW()
             WHERE apply_id = $1 AND user_id = $2
             RETURNING {}",
            APPLY_COLUMNS
        ))
        .bind(apply_id)
        .bind(user_id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(apply)
    }

    async fn delete_apply(&self, user_id: i64, apply_id: i64) -> Result<Option<i64>, DatabaseError> {
        let deleted = sqlx::query_scalar::<_, i64>(
            "DELETE FROM applies WHERE apply_id = $1 AND user_id = $2 RETURNING apply_id",
        )
        .bind(apply_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(deleted)
    }

    async fn create_post(&self, new_post: NewPost) -> Result<Post, DatabaseError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (user_id, title, content) VALUES ($1, $2, $3) RETURNING {}",
            POST_COLUMNS
        ))
        .bind(new_post.user_id)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn list_posts(&self) -> Result<Vec<PostSummary>, DatabaseError> {
        let rows = sqlx::query_as::<_, PostSummary>(
            "SELECT post_id, user_id, title, created_at, updated_at
             FROM posts
             ORDER BY created_at DESC, post_id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>, DatabaseError> {
        let post = sqlx::query_as::<_, Post>(&format!("SELECT {} FROM posts WHERE post_id = $1", POST_COLUMNS))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn create_comment(&self, new_comment: NewComment) -> Result<Comment, DatabaseError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments (user_id, post_id, content) VALUES ($1, $2, $3) RETURNING {}",
            COMMENT_COLUMNS
        ))
        .bind(new_comment.user_id)
        .bind(new_comment.post_id)
        .bind(&new_comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // Parent post deleted between the existence check and the insert
            sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                DatabaseError::NotFound("post does not exist".to_string())
            }
            _ => DatabaseError::Sqlx(e),
        })?;
        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, DatabaseError> {
        let rows = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {} FROM comments WHERE post_id = $1 ORDER BY created_at DESC, comment_id DESC",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
