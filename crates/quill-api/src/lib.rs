//! HTTP surface: auth, profile, posts, comments and replies.

pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod password;
pub mod posts;
mod query;
pub mod replies;
pub mod state;
pub mod token;
pub mod users;
mod views;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use serde_json::{Value, json};

pub use error::ApiError;
pub use password::SecretHasher;
pub use state::{AppState, AppStateInner};
pub use token::TokenService;

/// Build the application router. Reads are public; every mutation and the
/// profile endpoints sit behind [`middleware::require_auth`].
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/v1/auth/signup", post(auth::signup))
        .route("/v1/auth/verify", post(auth::verify_email))
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/posts", get(posts::list_posts))
        .route("/v1/posts/{id}", get(posts::get_post))
        .route("/v1/comments", get(comments::list_comments))
        .route("/v1/replies", get(replies::list_replies));

    let protected = Router::new()
        .route("/v1/users/me", get(users::me).put(users::update_me))
        .route("/v1/posts", post(posts::create_post))
        .route(
            "/v1/posts/{id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/v1/comments", post(comments::create_comment))
        .route(
            "/v1/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/v1/replies", post(replies::create_reply))
        .route(
            "/v1/replies/{id}",
            put(replies::update_reply).delete(replies::delete_reply),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    public
        .merge(protected)
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("route not found".into())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("method not allowed on this route".into())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
