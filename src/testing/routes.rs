use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

use super::TestContext;
use crate::auth::password::VERIFIED_CANDIDATES;
use crate::error::INTERNAL_ERROR_MESSAGE;
use crate::middleware::panic_response;
use crate::session::{token_digest, SessionStore};

fn resume_body() -> String {
    "I have built and operated web services for several years. ".repeat(3)
}

#[tokio::test]
async fn health_reports_database_state() {
    let ctx = TestContext::new();
    let response = ctx.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");

    ctx.store.set_healthy(false);
    let response = ctx.get("/health", None).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn sign_up_then_sign_in() {
    let ctx = TestContext::new();
    let response = ctx
        .json(
            "POST",
            "/api/sign-up",
            None,
            json!({"email": "a@b.co", "password": "secret", "rePassword": "secret", "name": "A"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["email"], "a@b.co");
    assert_eq!(response.body["name"], "A");
    assert_eq!(response.body["role"], "APPLICANT");
    assert!(response.body["userId"].as_i64().is_some());
    assert!(response.body.get("password").is_none());

    let response = ctx
        .json("POST", "/api/sign-in", None, json!({"email": "a@b.co", "password": "secret"}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let token = response.body["AccessToken"].as_str().unwrap();
    assert!(!token.is_empty());

    let cookies = response.set_cookies();
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with(&format!("authorization=Bearer%20{}", token)));
    assert!(cookies[0].contains("HttpOnly"));
}

#[tokio::test]
async fn sign_up_with_short_password_creates_nothing() {
    let ctx = TestContext::new();
    let response = ctx
        .json(
            "POST",
            "/api/sign-up",
            None,
            json!({"email": "a@b.co", "password": "12345", "rePassword": "12345", "name": "A"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], true);
    assert_eq!(ctx.store.user_count(), 0);
}

#[tokio::test]
async fn sign_up_is_atomic() {
    let ctx = TestContext::new();
    ctx.store.fail_profile_insert(true);

    let response = ctx
        .json(
            "POST",
            "/api/sign-up",
            None,
            json!({"email": "a@b.co", "password": "secret", "rePassword": "secret", "name": "A"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], INTERNAL_ERROR_MESSAGE);
    assert!(!response.body.to_string().contains("injected"));
    assert_eq!(ctx.store.user_count(), 0);
}

#[tokio::test]
async fn sign_up_rejects_duplicate_email() {
    let ctx = TestContext::new();
    ctx.signed_in("a@b.co", "A").await;

    let response = ctx
        .json(
            "POST",
            "/api/sign-up",
            None,
            json!({"email": "a@b.co", "password": "secret", "rePassword": "secret", "name": "B"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(ctx.store.user_count(), 1);
}

#[tokio::test]
async fn sign_in_failures_are_indistinguishable() {
    let ctx = TestContext::new();
    ctx.signed_in("a@b.co", "A").await;

    let wrong_password = ctx
        .json("POST", "/api/sign-in", None, json!({"email": "a@b.co", "password": "wrong-for-known"}))
        .await;
    let unknown_email = ctx
        .json("POST", "/api/sign-in", None, json!({"email": "z@b.co", "password": "any-for-unknown"}))
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status, unknown_email.status);
    assert_eq!(wrong_password.body, unknown_email.body);

    // Both paths ran the password hasher
    let verified = VERIFIED_CANDIDATES.lock().unwrap().clone();
    assert!(verified.iter().any(|c| c == "wrong-for-known"));
    assert!(verified.iter().any(|c| c == "any-for-unknown"));
}

#[tokio::test]
async fn malformed_sign_in_is_a_validation_error() {
    let ctx = TestContext::new();
    let response = ctx
        .json("POST", "/api/sign-in", None, json!({"email": "not-an-email", "password": "secret"}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "invalid email format");
}

#[tokio::test]
async fn protected_routes_reject_bad_credentials_uniformly() {
    let ctx = TestContext::new();

    let missing = ctx.get("/api/users", None).await;
    let garbage = ctx.get("/api/users", Some("not.a.token")).await;
    let foreign = ctx.get("/api/users", Some(&token_for_unknown_user())).await;

    for response in [&missing, &garbage, &foreign] {
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body, missing.body);
    }
}

fn token_for_unknown_user() -> String {
    let issuer = crate::auth::TokenIssuer::new(&crate::config::AppConfig::for_tests().security);
    issuer.issue(crate::auth::TokenKind::Session, 9999).unwrap()
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;

    let request = Request::builder()
        .uri("/api/users")
        .header(header::COOKIE, format!("authorization=Bearer%20{}", token))
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["email"], "a@b.co");
    assert_eq!(response.body["data"]["userInfos"]["name"], "A");
    assert_eq!(response.body["data"]["userInfos"]["role"], "APPLICANT");
}

#[tokio::test]
async fn profile_change_appends_one_history_row_per_field() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;
    let user_id = ctx.get("/api/users", Some(&token)).await.body["data"]["userId"]
        .as_i64()
        .unwrap();

    let response = ctx
        .json("PATCH", "/api/users", Some(&token), json!({"name": "B"}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["data"],
        json!([{"changedField": "name", "oldValue": "A", "newValue": "B"}])
    );

    let history = ctx.store.history(user_id);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].changed_field, "name");
    assert_eq!(history[0].old_value, "A");
    assert_eq!(history[0].new_value, "B");

    // Same value again: nothing to record
    let response = ctx
        .json("PATCH", "/api/users", Some(&token), json!({"name": "B"}))
        .await;
    assert_eq!(response.body["data"], json!([]));
    assert_eq!(ctx.store.history(user_id).len(), 1);

    let response = ctx.get("/api/users/history", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn profile_update_rejects_empty_and_role_changes() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;

    let empty = ctx.json("PATCH", "/api/users", Some(&token), json!({})).await;
    assert_eq!(empty.status, StatusCode::FORBIDDEN);

    let role = ctx
        .json("PATCH", "/api/users", Some(&token), json!({"role": "ADMIN"}))
        .await;
    assert_eq!(role.status, StatusCode::BAD_REQUEST);

    let profile = ctx.get("/api/users", Some(&token)).await;
    assert_eq!(profile.body["data"]["userInfos"]["role"], "APPLICANT");
}

#[tokio::test]
async fn profile_field_can_be_cleared_with_null() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;
    let user_id = ctx.get("/api/users", Some(&token)).await.body["data"]["userId"]
        .as_i64()
        .unwrap();

    let response = ctx
        .json("PATCH", "/api/users", Some(&token), json!({"gender": "F", "age": 30}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx
        .json("PATCH", "/api/users", Some(&token), json!({"gender": null, "name": "B"}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["data"],
        json!([
            {"changedField": "name", "oldValue": "A", "newValue": "B"},
            {"changedField": "gender", "oldValue": "F", "newValue": "null"}
        ])
    );

    let history = ctx.store.history(user_id);
    let cleared = history.iter().find(|h| h.changed_field == "gender" && h.new_value == "null");
    assert_eq!(cleared.map(|h| h.old_value.as_str()), Some("F"));

    let profile = ctx.get("/api/users", Some(&token)).await;
    assert_eq!(profile.body["data"]["userInfos"]["gender"], json!(null));
    assert_eq!(profile.body["data"]["userInfos"]["age"], 30);

    // name is required, so null is a rule failure rather than a clear
    let response = ctx
        .json("PATCH", "/api/users", Some(&token), json!({"name": null}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "name is required");
}

#[tokio::test]
async fn short_resume_content_is_rejected_without_mutation() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;

    let response = ctx
        .json("POST", "/api/posts", Some(&token), json!({"title": "t", "content": "too short"}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(ctx.store.apply_count(), 0);

    let created = ctx
        .json("POST", "/api/posts", Some(&token), json!({"title": "t", "content": resume_body()}))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let apply_id = created.body["data"]["applyId"].as_i64().unwrap();

    let response = ctx
        .json(
            "PATCH",
            &format!("/api/posts/{}", apply_id),
            Some(&token),
            json!({"content": "too short"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let detail = ctx.get(&format!("/api/posts/{}", apply_id), Some(&token)).await;
    assert_eq!(detail.body["data"]["content"], resume_body());
}

#[tokio::test]
async fn resume_title_is_required_before_content() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;

    let response = ctx.json("POST", "/api/posts", Some(&token), json!({})).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "title is required");

    let response = ctx
        .json("PATCH", "/api/posts/1", Some(&token), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn resumes_are_scoped_to_their_owner() {
    let ctx = TestContext::new();
    let owner = ctx.signed_in("a@b.co", "A").await;
    let other = ctx.signed_in("c@d.co", "C").await;

    let created = ctx
        .json("POST", "/api/posts", Some(&owner), json!({"title": "Backend", "content": resume_body()}))
        .await;
    assert_eq!(created.body["data"]["state"], "APPLY");
    let apply_id = created.body["data"]["applyId"].as_i64().unwrap();
    let uri = format!("/api/posts/{}", apply_id);

    let list = ctx.get("/api/posts", Some(&owner)).await;
    assert_eq!(list.body["data"][0]["name"], "A");
    assert_eq!(ctx.get("/api/posts", Some(&other)).await.body["data"], json!([]));

    let foreign = ctx.get(&uri, Some(&other)).await;
    assert_eq!(foreign.status, StatusCode::OK);
    assert_eq!(foreign.body["data"], serde_json::Value::Null);

    let foreign_update = ctx
        .json("PATCH", &uri, Some(&other), json!({"title": "mine now"}))
        .await;
    assert_eq!(foreign_update.status, StatusCode::CONFLICT);
    assert_eq!(foreign_update.body["message"], "resume does not exist");

    let foreign_delete = ctx
        .send(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", other))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(foreign_delete.status, StatusCode::CONFLICT);
    assert_eq!(ctx.store.apply_count(), 1);

    let updated = ctx
        .json("PATCH", &uri, Some(&owner), json!({"title": "Backend engineer"}))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["title"], "Backend engineer");

    let deleted = ctx
        .send(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", owner))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["data"]["applyId"], apply_id);
    assert_eq!(ctx.store.apply_count(), 0);
}

#[tokio::test]
async fn non_numeric_ids_get_the_error_body() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;

    for (uri, token) in [
        ("/api/board/posts/abc", None),
        ("/api/posts/abc/comments", None),
        ("/api/posts/abc", Some(token.as_str())),
    ] {
        let response = ctx.get(uri, token).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.body["error"], true, "{}", uri);
        assert_eq!(response.body["code"], "BAD_REQUEST", "{}", uri);
    }

    let response = ctx
        .json("DELETE", "/api/posts/1x", Some(&token), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], true);
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;

    let response = ctx
        .json("POST", "/api/posts/404/comments", Some(&token), json!({"content": "hi"}))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "post does not exist");
    assert_eq!(ctx.store.comment_count(), 0);

    let listing = ctx.get("/api/posts/404/comments", None).await;
    assert_eq!(listing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn board_posts_and_comments() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("a@b.co", "A").await;

    let anonymous = ctx
        .json("POST", "/api/board/posts", None, json!({"title": "t", "content": "c"}))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let missing_content = ctx
        .json("POST", "/api/board/posts", Some(&token), json!({"title": "t"}))
        .await;
    assert_eq!(missing_content.status, StatusCode::FORBIDDEN);

    let post = ctx
        .json("POST", "/api/board/posts", Some(&token), json!({"title": "Hiring", "content": "Rust"}))
        .await;
    assert_eq!(post.status, StatusCode::CREATED);
    let post_id = post.body["data"]["postId"].as_i64().unwrap();

    let list = ctx.get("/api/board/posts", None).await;
    assert_eq!(list.body["data"][0]["title"], "Hiring");
    assert!(list.body["data"][0].get("content").is_none());

    let detail = ctx.get(&format!("/api/board/posts/{}", post_id), None).await;
    assert_eq!(detail.body["data"]["content"], "Rust");
    let gone = ctx.get("/api/board/posts/9999", None).await;
    assert_eq!(gone.status, StatusCode::OK);
    assert_eq!(gone.body["data"], serde_json::Value::Null);

    let comments_uri = format!("/api/posts/{}/comments", post_id);
    let empty = ctx.json("POST", &comments_uri, Some(&token), json!({})).await;
    assert_eq!(empty.status, StatusCode::FORBIDDEN);

    for content in ["first", "second"] {
        let response = ctx
            .json("POST", &comments_uri, Some(&token), json!({"content": content}))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let comments = ctx.get(&comments_uri, None).await;
    assert_eq!(comments.status, StatusCode::OK);
    assert_eq!(comments.body["data"][0]["content"], "second");
    assert_eq!(comments.body["data"][1]["content"], "first");
}

#[tokio::test]
async fn token_pair_refresh_and_revoke() {
    let ctx = TestContext::new();

    let issued = ctx
        .send(
            Request::builder()
                .method("POST")
                .uri("/tokens")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::USER_AGENT, "router-test")
                .body(Body::from(json!({"id": 7}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(issued.status, StatusCode::OK);

    let cookies = issued.set_cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with("accessToken="));
    let refresh = cookies[1]
        .strip_prefix("refreshToken=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_string();

    let entry = ctx.sessions.get(&token_digest(&refresh)).await.unwrap().unwrap();
    assert_eq!(entry.user_id, 7);
    assert_eq!(entry.user_agent.as_deref(), Some("router-test"));

    let refresh_request = || {
        Request::builder()
            .method("POST")
            .uri("/tokens/refresh")
            .header(header::COOKIE, format!("refreshToken={}", refresh))
            .body(Body::empty())
            .unwrap()
    };

    let refreshed = ctx.send(refresh_request()).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert!(refreshed.set_cookies()[0].starts_with("accessToken="));

    let revoked = ctx
        .send(
            Request::builder()
                .method("DELETE")
                .uri("/tokens")
                .header(header::COOKIE, format!("refreshToken={}", refresh))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(revoked.status, StatusCode::OK);
    assert_eq!(ctx.sessions.entry_count().await, 0);

    let after = ctx.send(refresh_request()).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() {
    let ctx = TestContext::new();
    let response = ctx.json("POST", "/tokens/refresh", None, json!({})).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

async fn boom() -> &'static str {
    panic!("secret detail")
}

#[tokio::test]
async fn panics_become_opaque_500() {
    let app = Router::new()
        .route("/boom", get(boom))
        .layer(CatchPanicLayer::custom(panic_response));

    let response = app
        .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
    assert!(!body.to_string().contains("secret detail"));
}
