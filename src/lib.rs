pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;
pub mod state;


use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{error_sink_middleware, jwt_auth_middleware, panic_response};
use crate::state::AppState;

/// Build the full router: public and protected routes plus the global layers.
pub fn app(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), jwt_auth_middleware);

    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/tokens", post(public::tokens::issue).delete(public::tokens::revoke))
        .route("/tokens/refresh", post(public::tokens::refresh))
        .route("/api/sign-up", post(public::auth::sign_up))
        .route("/api/sign-in", post(public::auth::sign_in))
        .route("/api/board/posts/:id", get(public::board::post_get));

    let protected_routes = Router::new()
        .route(
            "/api/users",
            get(protected::users::get).patch(protected::users::patch),
        )
        .route("/api/users/history", get(protected::users::history))
        .route(
            "/api/posts",
            get(protected::applies::list).post(protected::applies::post),
        )
        .route(
            "/api/posts/:id",
            get(protected::applies::get)
                .patch(protected::applies::patch)
                .delete(protected::applies::delete),
        )
        .route_layer(auth.clone());

    // Paths that mix a public read with an authenticated write
    let mixed_routes = Router::new()
        .route(
            "/api/board/posts",
            get(public::board::posts_list)
                .merge(post(protected::board::post_create).route_layer(auth.clone())),
        )
        .route(
            "/api/posts/:id/comments",
            get(public::board::comments_list)
                .merge(post(protected::board::comment_create).route_layer(auth)),
        );

    let cors = cors_layer(&state.config.security);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(mixed_routes)
        .with_state(state)
        // Global middleware, innermost first
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(error_sink_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Cookies only cross origins with credentials allowed, which rules out `*`.
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn root() -> Json<Value> {
    Json(json!({
        "data": {
            "name": "jobboard-api",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "tokens": "/tokens, /tokens/refresh (public)",
                "auth": "/api/sign-up, /api/sign-in (public)",
                "users": "/api/users, /api/users/history (protected)",
                "resumes": "/api/posts[/:id] (protected)",
                "board": "/api/board/posts[/:id] (read public, write protected)",
                "comments": "/api/posts/:id/comments (read public, write protected)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
