use axum::{routing::delete, routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", get(handlers::login_page).post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/account", delete(handlers::delete_account))
}

pub fn groups() -> Router<AppState> {
    Router::new()
        .route("/groups", post(handlers::create_group))
        .route("/groups/:slug", delete(handlers::delete_group))
        .route("/group/:slug", get(handlers::group_feed))
}

pub fn blog() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/new", post(handlers::new_post))
        .route("/follow", get(handlers::follow_feed))
        .route("/:username", get(handlers::profile))
        .route("/:username/follow", post(handlers::follow_author))
        .route("/:username/unfollow", post(handlers::unfollow_author))
        .route("/:username/:post_id", get(handlers::post_view))
        .route("/:username/:post_id/edit", post(handlers::edit_post))
        .route("/:username/:post_id/comment", post(handlers::add_comment))
}
