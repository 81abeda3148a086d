use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminToken, AuthUser, MaybeUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::feed())
        .merge(routes::categories())
        .merge(routes::posts())
        .merge(routes::comments())
        .merge(routes::profiles())
        .merge(routes::auth())
        .merge(routes::images(state.image_max_bytes))
        .merge(routes::admin())
        .fallback(handlers::not_found)
        .with_state(state)
}
