use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::{AuthService, Signup};
use crate::app::categories::CategoryService;
use crate::app::comments::CommentService;
use crate::app::images::ImageService;
use crate::app::locations::LocationService;
use crate::app::posts::{NewPost, PostService};
use crate::app::profiles::{ProfileService, ProfileUpdate};
use crate::app::visibility;
use crate::domain::category::Category;
use crate::domain::comment::Comment;
use crate::domain::image::PostImage;
use crate::domain::location::Location;
use crate::domain::post::Post;
use crate::domain::user::{PublicProfile, User};
use crate::http::{AdminToken, AppError, AuthUser, MaybeUser};
use crate::AppState;

const PAGE_SIZE: i64 = 10;
const MAX_TITLE_CHARS: usize = 256;
const MAX_USERNAME_CHARS: usize = 150;
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 128;

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Serialize)]
pub struct PageInfo {
    pub page: i64,
    pub pages: i64,
    pub total: i64,
}

/// Fixed page size of 10; out-of-range page numbers clamp to the nearest
/// valid page instead of erroring.
fn resolve_page(requested: Option<i64>, total: i64) -> (PageInfo, i64) {
    let pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
    let page = requested.unwrap_or(1).clamp(1, pages);
    let offset = (page - 1) * PAGE_SIZE;
    (PageInfo { page, pages, total }, offset)
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    )
}

fn image_service(state: &AppState) -> ImageService {
    ImageService::new(
        state.db.clone(),
        state.storage.clone(),
        state.image_url_ttl_seconds,
    )
}

fn form_echo<T: Serialize>(form: &T) -> Value {
    serde_json::to_value(form).unwrap_or(Value::Null)
}

fn post_detail_path(post_id: Uuid) -> String {
    format!("/posts/{}", post_id)
}

fn profile_path(username: &str) -> String {
    format!("/profile/{}", username)
}

pub async fn not_found() -> AppError {
    AppError::not_found("page not found")
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct FeedResponse {
    pub items: Vec<Post>,
    #[serde(flatten)]
    pub page: PageInfo,
}

pub async fn home_feed(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let posts = PostService::new(state.db.clone());

    let total = posts.count_public().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load feed");
        AppError::internal("failed to load feed")
    })?;
    let (page, offset) = resolve_page(query.page, total);

    let mut items = posts.list_public(PAGE_SIZE, offset).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load feed");
        AppError::internal("failed to load feed")
    })?;

    if let Err(err) = image_service(&state).attach_post_urls(&mut items).await {
        tracing::warn!(error = ?err, "failed to resolve image urls");
    }

    Ok(Json(FeedResponse { items, page }))
}

#[derive(Serialize)]
pub struct CategoryFeedResponse {
    pub category: Category,
    pub items: Vec<Post>,
    #[serde(flatten)]
    pub page: PageInfo,
}

pub async fn category_feed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryFeedResponse>, AppError> {
    let categories = CategoryService::new(state.db.clone());
    let category = categories
        .get_published_by_slug(&slug)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load category");
            AppError::internal("failed to load category")
        })?
        .ok_or_else(|| AppError::not_found("category not found"))?;

    let posts = PostService::new(state.db.clone());
    let total = posts.count_by_category(category.id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load category feed");
        AppError::internal("failed to load category feed")
    })?;
    let (page, offset) = resolve_page(query.page, total);

    let mut items = posts
        .list_by_category(category.id, PAGE_SIZE, offset)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load category feed");
            AppError::internal("failed to load category feed")
        })?;

    if let Err(err) = image_service(&state).attach_post_urls(&mut items).await {
        tracing::warn!(error = ?err, "failed to resolve image urls");
    }

    Ok(Json(CategoryFeedResponse {
        category,
        items,
        page,
    }))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Deserialize, Serialize)]
pub struct PostForm {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub pub_date: Option<OffsetDateTime>,
    pub is_published: Option<bool>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub image_id: Option<Uuid>,
}

/// Field checks plus referential ones (category/location must exist, the
/// image must belong to the author). Everything wrong with the submission
/// is reported in one response.
async fn build_new_post(
    state: &AppState,
    author_id: Uuid,
    form: &PostForm,
) -> Result<NewPost, AppError> {
    let mut fields = BTreeMap::new();

    let title = form.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        fields.insert("title".to_string(), "title is required".to_string());
    } else if title.chars().count() > MAX_TITLE_CHARS {
        fields.insert(
            "title".to_string(),
            format!("title must be at most {} characters", MAX_TITLE_CHARS),
        );
    }

    let body = form.body.as_deref().unwrap_or("").trim().to_string();
    if body.is_empty() {
        fields.insert("body".to_string(), "body is required".to_string());
    }

    if form.pub_date.is_none() {
        fields.insert("pub_date".to_string(), "pub_date is required".to_string());
    }

    if let Some(category_id) = form.category_id {
        let known = CategoryService::new(state.db.clone())
            .get_category(category_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to validate post");
                AppError::internal("failed to validate post")
            })?;
        if known.is_none() {
            fields.insert("category_id".to_string(), "unknown category".to_string());
        }
    }

    if let Some(location_id) = form.location_id {
        let known = LocationService::new(state.db.clone())
            .get_location(location_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to validate post");
                AppError::internal("failed to validate post")
            })?;
        if known.is_none() {
            fields.insert("location_id".to_string(), "unknown location".to_string());
        }
    }

    if let Some(image_id) = form.image_id {
        let owned = image_service(state)
            .get_owned(image_id, author_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to validate post");
                AppError::internal("failed to validate post")
            })?;
        if owned.is_none() {
            fields.insert("image_id".to_string(), "unknown image".to_string());
        }
    }

    if !fields.is_empty() {
        return Err(AppError::validation(fields).with_form(form_echo(form)));
    }

    Ok(NewPost {
        title,
        body,
        pub_date: form.pub_date.unwrap_or_else(OffsetDateTime::now_utc),
        is_published: form.is_published.unwrap_or(true),
        category_id: form.category_id,
        location_id: form.location_id,
        image_id: form.image_id,
    })
}

pub async fn new_post_form(_user: AuthUser) -> Json<PostForm> {
    Json(PostForm {
        title: Some(String::new()),
        body: Some(String::new()),
        pub_date: Some(OffsetDateTime::now_utc()),
        is_published: Some(true),
        category_id: None,
        location_id: None,
        image_id: None,
    })
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(form): Json<PostForm>,
) -> Result<Redirect, AppError> {
    let new_post = build_new_post(&state, user.user_id, &form).await?;

    let author = ProfileService::new(state.db.clone())
        .get_by_id(user.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create post");
            AppError::internal("failed to create post")
        })?
        .ok_or_else(AppError::login_redirect)?;

    PostService::new(state.db.clone())
        .create_post(user.user_id, new_post)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok(Redirect::to(&profile_path(&author.username)))
}

#[derive(Serialize)]
pub struct PostDetailResponse {
    pub post: Post,
    pub comments: Vec<Comment>,
}

pub async fn post_detail(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostDetailResponse>, AppError> {
    let mut post = PostService::new(state.db.clone())
        .get_post(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load post");
            AppError::internal("failed to load post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    // Invisible and missing are the same thing to a stranger.
    if !visibility::can_view_post(viewer.user_id(), &post, OffsetDateTime::now_utc()) {
        return Err(AppError::not_found("post not found"));
    }

    let comments = CommentService::new(state.db.clone())
        .list_for_post(post.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load comments");
            AppError::internal("failed to load comments")
        })?;

    if let Err(err) = image_service(&state).attach_url(&mut post).await {
        tracing::warn!(error = ?err, "failed to resolve image url");
    }

    Ok(Json(PostDetailResponse { post, comments }))
}

pub async fn edit_post_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostForm>, AppError> {
    let post = PostService::new(state.db.clone())
        .get_post(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load post");
            AppError::internal("failed to load post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    // Someone else's post: back to the read view, not an error.
    if !visibility::can_modify(user.user_id, post.author_id) {
        return Err(AppError::see_other(post_detail_path(post.id)));
    }

    Ok(Json(PostForm {
        title: Some(post.title),
        body: Some(post.body),
        pub_date: Some(post.pub_date),
        is_published: Some(post.is_published),
        category_id: post.category_id,
        location_id: post.location_id,
        image_id: post.image_id,
    }))
}

pub async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(form): Json<PostForm>,
) -> Result<Redirect, AppError> {
    let posts = PostService::new(state.db.clone());
    let post = posts
        .get_post(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to update post");
            AppError::internal("failed to update post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    if !visibility::can_modify(user.user_id, post.author_id) {
        return Err(AppError::see_other(post_detail_path(post.id)));
    }

    let new_post = build_new_post(&state, user.user_id, &form).await?;
    posts
        .update_post(post.id, user.user_id, new_post)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to update post");
            AppError::internal("failed to update post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    Ok(Redirect::to(&post_detail_path(post.id)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let posts = PostService::new(state.db.clone());
    let post = posts
        .get_post(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to delete post");
            AppError::internal("failed to delete post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    if !visibility::can_modify(user.user_id, post.author_id) {
        return Err(AppError::see_other(post_detail_path(post.id)));
    }

    posts.delete_post(post.id, user.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to delete post");
        AppError::internal("failed to delete post")
    })?;

    let username = post.author_username.unwrap_or_default();
    Ok(Redirect::to(&profile_path(&username)))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Deserialize, Serialize)]
pub struct CommentForm {
    pub body: Option<String>,
}

fn validate_comment_body(form: &CommentForm) -> Result<String, AppError> {
    let body = form.body.as_deref().unwrap_or("").trim().to_string();
    if body.is_empty() {
        let mut fields = BTreeMap::new();
        fields.insert("body".to_string(), "body is required".to_string());
        return Err(AppError::validation(fields).with_form(form_echo(form)));
    }
    Ok(body)
}

pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
    Json(form): Json<CommentForm>,
) -> Result<Redirect, AppError> {
    let post = PostService::new(state.db.clone())
        .get_post(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to add comment");
            AppError::internal("failed to add comment")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    if !visibility::can_view_post(Some(user.user_id), &post, OffsetDateTime::now_utc()) {
        return Err(AppError::not_found("post not found"));
    }

    let body = validate_comment_body(&form)?;

    // Author and post come from the session and the path; the form only
    // ever supplies the text.
    CommentService::new(state.db.clone())
        .add_comment(post.id, user.user_id, body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to add comment");
            AppError::internal("failed to add comment")
        })?;

    Ok(Redirect::to(&post_detail_path(post.id)))
}

pub async fn edit_comment_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CommentForm>, AppError> {
    let comment = CommentService::new(state.db.clone())
        .get_comment(post_id, comment_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load comment");
            AppError::internal("failed to load comment")
        })?
        .ok_or_else(|| AppError::not_found("comment not found"))?;

    if !visibility::can_modify(user.user_id, comment.author_id) {
        return Err(AppError::forbidden("cannot edit someone else's comment"));
    }

    Ok(Json(CommentForm {
        body: Some(comment.body),
    }))
}

pub async fn update_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(form): Json<CommentForm>,
) -> Result<Redirect, AppError> {
    let comments = CommentService::new(state.db.clone());
    let comment = comments
        .get_comment(post_id, comment_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to update comment");
            AppError::internal("failed to update comment")
        })?
        .ok_or_else(|| AppError::not_found("comment not found"))?;

    if !visibility::can_modify(user.user_id, comment.author_id) {
        return Err(AppError::forbidden("cannot edit someone else's comment"));
    }

    let body = validate_comment_body(&form)?;
    comments
        .update_comment(post_id, comment_id, user.user_id, body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to update comment");
            AppError::internal("failed to update comment")
        })?
        .ok_or_else(|| AppError::not_found("comment not found"))?;

    Ok(Redirect::to(&post_detail_path(post_id)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Redirect, AppError> {
    let comments = CommentService::new(state.db.clone());
    let comment = comments
        .get_comment(post_id, comment_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to delete comment");
            AppError::internal("failed to delete comment")
        })?
        .ok_or_else(|| AppError::not_found("comment not found"))?;

    if !visibility::can_modify(user.user_id, comment.author_id) {
        return Err(AppError::forbidden("cannot delete someone else's comment"));
    }

    comments
        .delete_comment(post_id, comment_id, user.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to delete comment");
            AppError::internal("failed to delete comment")
        })?;

    Ok(Redirect::to(&post_detail_path(post_id)))
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: PublicProfile,
    pub is_owner: bool,
    pub items: Vec<Post>,
    #[serde(flatten)]
    pub page: PageInfo,
}

pub async fn profile(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = ProfileService::new(state.db.clone())
        .get_by_username(&username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load profile");
            AppError::internal("failed to load profile")
        })?
        .ok_or_else(|| AppError::not_found("profile not found"))?;

    // Owners see their whole archive, scheduled and hidden posts included.
    let is_owner = viewer.user_id() == Some(user.id);

    let posts = PostService::new(state.db.clone());
    let total = posts
        .count_by_author(user.id, is_owner)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load profile");
            AppError::internal("failed to load profile")
        })?;
    let (page, offset) = resolve_page(query.page, total);

    let mut items = posts
        .list_by_author(user.id, is_owner, PAGE_SIZE, offset)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load profile");
            AppError::internal("failed to load profile")
        })?;

    if let Err(err) = image_service(&state).attach_post_urls(&mut items).await {
        tracing::warn!(error = ?err, "failed to resolve image urls");
    }

    Ok(Json(ProfileResponse {
        profile: user.into(),
        is_owner,
        items,
        page,
    }))
}

#[derive(Deserialize, Serialize)]
pub struct ProfileForm {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

pub async fn edit_profile_form(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileForm>, AppError> {
    let current = ProfileService::new(state.db.clone())
        .get_by_id(user.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load profile");
            AppError::internal("failed to load profile")
        })?
        .ok_or_else(AppError::login_redirect)?;

    Ok(Json(ProfileForm {
        username: Some(current.username),
        first_name: Some(current.first_name),
        last_name: Some(current.last_name),
        email: current.email,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(form): Json<ProfileForm>,
) -> Result<Redirect, AppError> {
    let mut fields = BTreeMap::new();
    if let Some(username) = &form.username {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            fields.insert("username".to_string(), "username is required".to_string());
        } else if trimmed.chars().count() > MAX_USERNAME_CHARS {
            fields.insert(
                "username".to_string(),
                format!("username must be at most {} characters", MAX_USERNAME_CHARS),
            );
        }
    }
    if !fields.is_empty() {
        return Err(AppError::validation(fields).with_form(form_echo(&form)));
    }

    let updated = ProfileService::new(state.db.clone())
        .update_profile(
            user.user_id,
            form.username.as_ref().map(|name| name.trim().to_string()),
            form.first_name.clone(),
            form.last_name.clone(),
            form.email.clone(),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to update profile");
            AppError::internal("failed to update profile")
        })?;

    match updated {
        ProfileUpdate::Updated(current) => Ok(Redirect::to(&profile_path(&current.username))),
        ProfileUpdate::UsernameTaken => {
            let mut fields = BTreeMap::new();
            fields.insert("username".to_string(), "username already taken".to_string());
            Err(AppError::validation(fields).with_form(form_echo(&form)))
        }
        ProfileUpdate::NotFound => Err(AppError::login_redirect()),
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::bad_request("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(AppError::bad_request(format!(
            "username must be at most {} characters",
            MAX_USERNAME_CHARS
        )));
    }
    if payload.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    if payload.password.chars().count() > MAX_PASSWORD_CHARS {
        return Err(AppError::bad_request(format!(
            "password must be at most {} characters",
            MAX_PASSWORD_CHARS
        )));
    }

    let user = auth_service(&state)
        .signup(Signup {
            username,
            password: payload.password,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to sign up");
            AppError::internal("failed to sign up")
        })?;

    match user {
        Some(user) => Ok((StatusCode::CREATED, Json(user))),
        None => Err(AppError::conflict("username already taken")),
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_CHARS {
        return Err(AppError::bad_request(format!(
            "password must be at most {} characters",
            MAX_PASSWORD_CHARS
        )));
    }

    let tokens = auth_service(&state)
        .login(&payload.username, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let tokens = auth_service(&state)
        .refresh(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to refresh token");
            AppError::internal("failed to refresh token")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid refresh token")),
    }
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<LogoutResponse>, AppError> {
    let revoked = auth_service(&state)
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to logout");
            AppError::internal("failed to logout")
        })?;

    Ok(Json(LogoutResponse { revoked }))
}

pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<User>, AppError> {
    let current = ProfileService::new(state.db.clone())
        .get_by_id(user.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load current user");
            AppError::internal("failed to load current user")
        })?
        .ok_or_else(AppError::login_redirect)?;

    Ok(Json(current))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    if payload.new_password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    if payload.new_password.chars().count() > MAX_PASSWORD_CHARS {
        return Err(AppError::bad_request(format!(
            "password must be at most {} characters",
            MAX_PASSWORD_CHARS
        )));
    }

    let changed = auth_service(&state)
        .change_password(user.user_id, &payload.old_password, &payload.new_password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to change password");
            AppError::internal("failed to change password")
        })?;

    if !changed {
        return Err(AppError::bad_request("current password is incorrect"));
    }

    // Best-effort notification; a mail failure never fails the request.
    let current = ProfileService::new(state.db.clone())
        .get_by_id(user.user_id)
        .await
        .ok()
        .flatten();
    if let Some(email) = current.and_then(|current| current.email) {
        if let Err(err) = state
            .mailer
            .send(&email, "Password changed", "Your password was changed.")
            .await
        {
            tracing::warn!(error = ?err, "failed to send password change mail");
        }
    }

    Ok(Json(StatusResponse {
        status: "password changed",
    }))
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<PostImage>), AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("request body is empty"));
    }
    if body.len() > state.image_max_bytes {
        return Err(AppError::bad_request("image too large"));
    }

    let image = image_service(&state)
        .upload(user.user_id, body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to store image");
            AppError::internal("failed to store image")
        })?
        .ok_or_else(|| AppError::bad_request("unsupported or corrupt image"))?;

    Ok((StatusCode::CREATED, Json(image)))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub is_published: Option<bool>,
}

pub async fn admin_create_category(
    State(state): State<AppState>,
    _admin: AdminToken,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::bad_request(format!(
            "title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    let slug = payload.slug.trim().to_string();
    let slug_ok = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !slug_ok {
        return Err(AppError::bad_request(
            "slug may only contain letters, digits, hyphens and underscores",
        ));
    }

    let category = CategoryService::new(state.db.clone())
        .create_category(
            title,
            payload.description.unwrap_or_default(),
            slug,
            payload.is_published.unwrap_or(true),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create category");
            AppError::internal("failed to create category")
        })?;

    match category {
        Some(category) => Ok((StatusCode::CREATED, Json(category))),
        None => Err(AppError::conflict("slug already in use")),
    }
}

#[derive(Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub is_published: Option<bool>,
}

pub async fn admin_create_location(
    State(state): State<AppState>,
    _admin: AdminToken,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<Location>), AppError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    if name.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::bad_request(format!(
            "name must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }

    let location = LocationService::new(state.db.clone())
        .create_location(name, payload.is_published.unwrap_or(true))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create location");
            AppError::internal("failed to create location")
        })?;

    Ok((StatusCode::CREATED, Json(location)))
}
