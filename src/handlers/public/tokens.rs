use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{cookie, TokenKind, AUTH_FAILURE_MESSAGE};
use crate::error::ApiError;
use crate::handlers::validation::json_body;
use crate::session::{token_digest, SessionEntry};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct IssueRequest {
    pub id: Option<i64>,
}

/// Client address: first `X-Forwarded-For` hop, else the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn cookie_header(state: &AppState, name: &str, token: &str) -> Result<axum::http::HeaderValue, ApiError> {
    cookie::set_cookie(name, token, state.cookie_secure())
        .ok_or_else(|| ApiError::internal(format!("{} is not a valid cookie value", name)))
}

/// POST /tokens - Issue an access/refresh pair for `{ "id": <userId> }`
///
/// The refresh token is recorded in the session registry together with the
/// caller's address and user agent.
pub async fn issue(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let user_id = request.id.ok_or_else(|| ApiError::validation("id is required"))?;

    let access = state.tokens.issue(TokenKind::Access, user_id)?;
    let refresh = state.tokens.issue(TokenKind::Refresh, user_id)?;

    let now = Utc::now();
    let entry = SessionEntry {
        user_id,
        ip: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
        user_agent: user_agent(&headers),
        issued_at: now,
        expires_at: now + state.tokens.refresh_ttl(),
    };
    state.sessions.put(token_digest(&refresh), entry).await?;

    tracing::info!(user_id, "Issued access and refresh tokens");

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, cookie_header(&state, cookie::ACCESS_COOKIE, &access)?),
            (header::SET_COOKIE, cookie_header(&state, cookie::REFRESH_COOKIE, &refresh)?),
        ]),
        Json(json!({ "message": "tokens issued" })),
    ))
}

/// POST /tokens/refresh - Mint a new access token from a registered refresh token
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = cookie::get_cookie(&headers, cookie::REFRESH_COOKIE)
        .ok_or_else(|| ApiError::unauthorized(AUTH_FAILURE_MESSAGE))?;

    let claims = state.tokens.verify(TokenKind::Refresh, token)?;

    let entry = state.sessions.get(&token_digest(token)).await?;
    match entry {
        Some(entry) if entry.user_id == claims.user_id => {}
        _ => {
            tracing::debug!(user_id = claims.user_id, "Refresh token not in registry");
            return Err(ApiError::unauthorized(AUTH_FAILURE_MESSAGE));
        }
    }

    let access = state.tokens.issue(TokenKind::Access, claims.user_id)?;

    Ok((
        [(header::SET_COOKIE, cookie_header(&state, cookie::ACCESS_COOKIE, &access)?)],
        Json(json!({ "message": "access token refreshed" })),
    ))
}

/// DELETE /tokens - Forget the presented refresh token and clear both cookies
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = cookie::get_cookie(&headers, cookie::REFRESH_COOKIE) {
        state.sessions.expire(&token_digest(token)).await?;
    }

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, cookie::clear_cookie(cookie::ACCESS_COOKIE)),
            (header::SET_COOKIE, cookie::clear_cookie(cookie::REFRESH_COOKIE)),
        ]),
        Json(json!({ "message": "tokens revoked" })),
    ))
}
