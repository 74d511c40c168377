use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Role given to every account created through signup.
pub const DEFAULT_ROLE: &str = "APPLICANT";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub email: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: i64,
    pub name: String,
    pub role: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserHistory {
    pub user_history_id: i64,
    pub user_id: i64,
    pub changed_field: String,
    pub old_value: String,
    pub new_value: String,
    pub changed_at: DateTime<Utc>,
}

/// Profile fields a user may change about themselves.
///
/// The outer `Option` tells whether a field was sent at all; an explicit
/// `null` arrives as `Some(None)` and clears the field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub age: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub profile_image: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.gender.is_none() && self.profile_image.is_none()
    }
}

/// One changed profile field, values stringified for the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub changed_field: String,
    pub old_value: String,
    pub new_value: String,
}

fn stringify<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map_or_else(|| "null".to_string(), ToString::to_string)
}

impl UserInfo {
    /// Apply every present field of `update` that differs from the current
    /// value and return one change per modified field.
    pub fn apply_update(&mut self, update: &ProfileUpdate) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        // `name` is NOT NULL; handlers reject an explicit null before we get here
        if let Some(Some(name)) = &update.name {
            if *name != self.name {
                changes.push(FieldChange {
                    changed_field: "name".to_string(),
                    old_value: self.name.clone(),
                    new_value: name.clone(),
                });
                self.name = name.clone();
            }
        }

        if let Some(age) = update.age {
            if age != self.age {
                changes.push(FieldChange {
                    changed_field: "age".to_string(),
                    old_value: stringify(&self.age),
                    new_value: stringify(&age),
                });
                self.age = age;
            }
        }

        if let Some(gender) = &update.gender {
            if *gender != self.gender {
                changes.push(FieldChange {
                    changed_field: "gender".to_string(),
                    old_value: stringify(&self.gender),
                    new_value: stringify(gender),
                });
                self.gender = gender.clone();
            }
        }

        if let Some(profile_image) = &update.profile_image {
            if *profile_image != self.profile_image {
                changes.push(FieldChange {
                    changed_field: "profileImage".to_string(),
                    old_value: stringify(&self.profile_image),
                    new_value: stringify(profile_image),
                });
                self.profile_image = profile_image.clone();
            }
        }

        changes
    }
}

/// `GET /api/users` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_infos: ProfileInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    pub name: String,
    pub role: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub profile_image: Option<String>,
}

impl UserProfile {
    pub fn new(user: &User, info: &UserInfo) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            user_infos: ProfileInfo {
                name: info.name.clone(),
                role: info.role.clone(),
                age: info.age,
                gender: info.gender.clone(),
                profile_image: info.profile_image.clone(),
            },
        }
    }
}
