use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Minimum resume body length, in characters.
pub const MIN_CONTENT_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyState {
    Apply,
    Drop,
    Pass,
    Interview1,
    Interview2,
    FinalPass,
}

#[derive(Debug, Error)]
#[error("unknown resume state: {0}")]
pub struct UnknownApplyState(pub String);

impl ApplyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyState::Apply => "APPLY",
            ApplyState::Drop => "DROP",
            ApplyState::Pass => "PASS",
            ApplyState::Interview1 => "INTERVIEW1",
            ApplyState::Interview2 => "INTERVIEW2",
            ApplyState::FinalPass => "FINAL_PASS",
        }
    }
}

impl TryFrom<String> for ApplyState {
    type Error = UnknownApplyState;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "APPLY" => Ok(ApplyState::Apply),
            "DROP" => Ok(ApplyState::Drop),
            "PASS" => Ok(ApplyState::Pass),
            "INTERVIEW1" => Ok(ApplyState::Interview1),
            "INTERVIEW2" => Ok(ApplyState::Interview2),
            "FINAL_PASS" => Ok(ApplyState::FinalPass),
            _ => Err(UnknownApplyState(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Apply {
    pub apply_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub state: ApplyState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resume joined with its owner's display name.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplyView {
    pub apply_id: i64,
    pub user_id: i64,
    pub name: String,
    pub title: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub state: ApplyState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApply {
    pub user_id: i64,
    pub title: String,
    pub content: String,
}
