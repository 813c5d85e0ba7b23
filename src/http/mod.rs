use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod forms;
mod handlers;
mod routes;

pub use auth::{AdminToken, AuthUser, MaybeAuthUser};
pub use error::{AppError, FieldErrors};

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::groups())
        .merge(routes::blog())
        .with_state(state)
}
