use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/", get(handlers::home_feed))
}

pub fn categories() -> Router<AppState> {
    Router::new().route("/category/:slug", get(handlers::category_feed))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/posts/new",
            get(handlers::new_post_form).post(handlers::create_post),
        )
        .route(
            "/posts/:id",
            get(handlers::post_detail).post(handlers::add_comment),
        )
        .route(
            "/posts/:id/edit",
            get(handlers::edit_post_form).post(handlers::update_post),
        )
        .route("/posts/:id/delete", post(handlers::delete_post))
}

pub fn comments() -> Router<AppState> {
    Router::new()
        .route(
            "/posts/:post_id/comment/:comment_id/edit",
            get(handlers::edit_comment_form).post(handlers::update_comment),
        )
        .route(
            "/posts/:post_id/comment/:comment_id/delete",
            post(handlers::delete_comment),
        )
}

pub fn profiles() -> Router<AppState> {
    Router::new()
        .route(
            "/profile/edit",
            get(handlers::edit_profile_form).post(handlers::update_profile),
        )
        .route("/profile/:username", get(handlers::profile))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/password-change", post(handlers::change_password))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn images(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/images", post(handlers::upload_image))
        .layer(DefaultBodyLimit::max(max_bytes))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/categories", post(handlers::admin_create_category))
        .route("/admin/locations", post(handlers::admin_create_location))
}
