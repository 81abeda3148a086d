//! Comment flow tests.
//!
//! Unlike posts, comment ownership violations are explicit: a non-author
//! gets a 403, not a redirect.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn add_comment_redirects_to_detail() {
    let app = app().await;
    let author = app.create_user("comment_add_a").await;
    let commenter = app.create_user("comment_add_b").await;
    let post_id = app.create_post(author.id, true, -1, None).await;

    let resp = app
        .post_json(
            &format!("/posts/{}", post_id),
            json!({ "body": "Nice post!" }),
            Some(&commenter.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(
        resp.location.as_deref(),
        Some(format!("/posts/{}", post_id).as_str())
    );

    let resp = app.get(&format!("/posts/{}", post_id), None).await;
    let body = resp.json();
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["comments"][0]["author_username"].as_str().unwrap(),
        commenter.username
    );
    assert_eq!(body["post"]["comment_count"].as_i64().unwrap(), 1);
}

#[tokio::test]
async fn comment_author_comes_from_session_not_payload() {
    let app = app().await;
    let author = app.create_user("comment_spoof_a").await;
    let commenter = app.create_user("comment_spoof_b").await;
    let post_id = app.create_post(author.id, true, -1, None).await;

    // Extra fields in the payload are ignored; the comment is attributed
    // to the session user regardless.
    let resp = app
        .post_json(
            &format!("/posts/{}", post_id),
            json!({
                "body": "spoofed?",
                "author_id": author.id.to_string(),
                "post_id": Uuid::new_v4().to_string(),
            }),
            Some(&commenter.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);

    let resp = app.get(&format!("/posts/{}", post_id), None).await;
    let body = resp.json();
    assert_eq!(
        body["comments"][0]["author_id"].as_str().unwrap(),
        commenter.id.to_string()
    );
    assert_eq!(
        body["comments"][0]["post_id"].as_str().unwrap(),
        post_id.to_string()
    );
}

#[tokio::test]
async fn empty_comment_body_is_a_validation_error() {
    let app = app().await;
    let author = app.create_user("comment_empty").await;
    let post_id = app.create_post(author.id, true, -1, None).await;

    let resp = app
        .post_json(
            &format!("/posts/{}", post_id),
            json!({ "body": "   " }),
            Some(&author.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["fields"]["body"].is_string());
}

#[tokio::test]
async fn commenting_on_invisible_post_404s() {
    let app = app().await;
    let author = app.create_user("comment_hidden_a").await;
    let stranger = app.create_user("comment_hidden_b").await;
    let post_id = app.create_post(author.id, false, -1, None).await;

    let resp = app
        .post_json(
            &format!("/posts/{}", post_id),
            json!({ "body": "hello?" }),
            Some(&stranger.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn commenting_requires_login() {
    let app = app().await;
    let author = app.create_user("comment_anon").await;
    let post_id = app.create_post(author.id, true, -1, None).await;

    let resp = app
        .post_json(&format!("/posts/{}", post_id), json!({ "body": "hi" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/auth/login"));
}

// ===========================================================================
// Edit / delete ownership
// ===========================================================================

#[tokio::test]
async fn editing_someone_elses_comment_is_forbidden() {
    let app = app().await;
    let author = app.create_user("comment_edit_a").await;
    let other = app.create_user("comment_edit_b").await;
    let post_id = app.create_post(author.id, true, -1, None).await;
    let comment_id = app.create_comment(post_id, author.id, "mine").await;

    let resp = app
        .get(
            &format!("/posts/{}/comment/{}/edit", post_id, comment_id),
            Some(&other.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_json(
            &format!("/posts/{}/comment/{}/edit", post_id, comment_id),
            json!({ "body": "hijacked" }),
            Some(&other.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn author_edits_own_comment() {
    let app = app().await;
    let author = app.create_user("comment_edit_own").await;
    let post_id = app.create_post(author.id, true, -1, None).await;
    let comment_id = app.create_comment(post_id, author.id, "tpyo").await;

    let resp = app
        .get(
            &format!("/posts/{}/comment/{}/edit", post_id, comment_id),
            Some(&author.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["body"].as_str().unwrap(), "tpyo");

    let resp = app
        .post_json(
            &format!("/posts/{}/comment/{}/edit", post_id, comment_id),
            json!({ "body": "typo fixed" }),
            Some(&author.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(
        resp.location.as_deref(),
        Some(format!("/posts/{}", post_id).as_str())
    );

    let resp = app.get(&format!("/posts/{}", post_id), None).await;
    assert_eq!(
        resp.json()["comments"][0]["body"].as_str().unwrap(),
        "typo fixed"
    );
}

#[tokio::test]
async fn deleting_someone_elses_comment_is_forbidden() {
    let app = app().await;
    let author = app.create_user("comment_del_a").await;
    let other = app.create_user("comment_del_b").await;
    let post_id = app.create_post(author.id, true, -1, None).await;
    let comment_id = app.create_comment(post_id, author.id, "keep me").await;

    let resp = app
        .post_json(
            &format!("/posts/{}/comment/{}/delete", post_id, comment_id),
            json!({}),
            Some(&other.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(app.count_comments(post_id).await, 1);
}

#[tokio::test]
async fn author_deletes_own_comment() {
    let app = app().await;
    let author = app.create_user("comment_del_own").await;
    let post_id = app.create_post(author.id, true, -1, None).await;
    let comment_id = app.create_comment(post_id, author.id, "going away").await;

    let resp = app
        .post_json(
            &format!("/posts/{}/comment/{}/delete", post_id, comment_id),
            json!({}),
            Some(&author.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(
        resp.location.as_deref(),
        Some(format!("/posts/{}", post_id).as_str())
    );
    assert_eq!(app.count_comments(post_id).await, 0);
}

#[tokio::test]
async fn comment_under_wrong_post_does_not_exist() {
    let app = app().await;
    let author = app.create_user("comment_wrongpost").await;
    let post_a = app.create_post(author.id, true, -1, None).await;
    let post_b = app.create_post(author.id, true, -1, None).await;
    let comment_id = app.create_comment(post_a, author.id, "on a").await;

    let resp = app
        .get(
            &format!("/posts/{}/comment/{}/edit", post_b, comment_id),
            Some(&author.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "comment not found");
}
