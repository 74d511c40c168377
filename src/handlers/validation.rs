use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Path,
};
use axum::Json;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::database::models::apply::MIN_CONTENT_CHARS;
use crate::error::ApiError;

pub const MIN_PASSWORD_CHARS: usize = 6;

// Unanchored: any address containing a match is accepted.
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9]+@[a-z]+\.[a-z]{2,3}").expect("email pattern compiles"));

/// Unwrap a JSON body, turning axum's rejection into a 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Unwrap a numeric path id, turning axum's rejection into a 400.
pub fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Present and not blank, or 403 `"<field> is required"`.
pub fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::validation(format!("{} is required", field))),
    }
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(ApiError::validation("invalid email format"))
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}

pub fn validate_resume_content(content: &str) -> Result<(), ApiError> {
    if content.chars().count() < MIN_CONTENT_CHARS {
        return Err(ApiError::validation(format!(
            "content must be at least {} characters",
            MIN_CONTENT_CHARS
        )));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub re_password: Option<String>,
    pub name: Option<String>,
}

/// Signup fields after every rule has passed.
#[derive(Debug, PartialEq, Eq)]
pub struct SignUp<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

impl SignUpRequest {
    /// Presence, email format, password length, confirmation; first failure wins.
    pub fn validate(&self) -> Result<SignUp<'_>, ApiError> {
        let email = require("email", self.email.as_deref())?;
        let password = require("password", self.password.as_deref())?;
        let re_password = require("rePassword", self.re_password.as_deref())?;
        let name = require("name", self.name.as_deref())?;

        validate_email(email)?;
        validate_password(password)?;
        if password != re_password {
            return Err(ApiError::validation("passwords do not match"));
        }

        Ok(SignUp { email, password, name })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl SignInRequest {
    pub fn validate(&self) -> Result<(&str, &str), ApiError> {
        let email = require("email", self.email.as_deref())?;
        let password = require("password", self.password.as_deref())?;
        validate_email(email)?;
        Ok((email, password))
    }
}

/// Body shared by resume and board post create/update.
#[derive(Debug, Default, Deserialize)]
pub struct TitleContentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl TitleContentRequest {
    pub fn require_both(&self) -> Result<(&str, &str), ApiError> {
        let title = require("title", self.title.as_deref())?;
        let content = require("content", self.content.as_deref())?;
        Ok((title, content))
    }
}
