use axum::http::{header, HeaderMap, HeaderValue};

pub const AUTHORIZATION_COOKIE: &str = "authorization";
pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Find a cookie value by name across all `Cookie` headers.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Strip the `Bearer` scheme, accepting the percent-encoded space cookies carry.
pub fn strip_bearer(value: &str) -> Option<&str> {
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Bearer%20"))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Bearer token from the `Authorization` header, falling back to the cookie.
pub fn bearer_from_request(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        return value.to_str().ok().and_then(strip_bearer);
    }
    get_cookie(headers, AUTHORIZATION_COOKIE).and_then(strip_bearer)
}

pub fn set_cookie(name: &str, value: &str, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

pub fn clear_cookie(name: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("{}=; Path=/; HttpOnly; Max-Age=0", name))
        .unwrap_or_else(|_| HeaderValue::from_static("expired=; Max-Age=0"))
}
