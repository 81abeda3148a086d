//! Profile view and profile edit tests.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

#[tokio::test]
async fn profile_owner_sees_everything_others_do_not() {
    let app = app().await;
    let owner = app.create_user("profile_owner").await;
    let stranger = app.create_user("profile_stranger").await;

    let public = app.create_post(owner.id, true, -1, None).await;
    let unpublished = app.create_post(owner.id, false, -1, None).await;
    let scheduled = app.create_post(owner.id, true, 24, None).await;

    let path = format!("/profile/{}", owner.username);

    let resp = app.get(&path, Some(&owner.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["is_owner"].as_bool().unwrap());
    assert_eq!(body["total"].as_i64().unwrap(), 3);

    for (viewer, label) in [
        (Some(stranger.access_token.as_str()), "stranger"),
        (None, "anonymous"),
    ] {
        let resp = app.get(&path, viewer).await;
        let body = resp.json();
        assert!(!body["is_owner"].as_bool().unwrap(), "{}", label);
        assert_eq!(body["total"].as_i64().unwrap(), 1, "{}", label);
        let ids: Vec<&str> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&public.to_string().as_str()));
        assert!(!ids.contains(&unpublished.to_string().as_str()));
        assert!(!ids.contains(&scheduled.to_string().as_str()));
    }
}

#[tokio::test]
async fn unknown_profile_404s() {
    let app = app().await;

    let resp = app.get("/profile/nobody_here_42", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "profile not found");
}

#[tokio::test]
async fn profile_edit_requires_login() {
    let app = app().await;

    let resp = app.get("/profile/edit", None).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/auth/login"));

    let resp = app
        .post_json("/profile/edit", json!({ "first_name": "x" }), None)
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/auth/login"));
}

#[tokio::test]
async fn edit_profile_form_returns_current_values() {
    let app = app().await;
    let user = app.create_user("profile_form").await;

    let resp = app.get("/profile/edit", Some(&user.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["username"].as_str().unwrap(), user.username);
}

#[tokio::test]
async fn update_profile_redirects_to_profile() {
    let app = app().await;
    let user = app.create_user("profile_update").await;

    let resp = app
        .post_json(
            "/profile/edit",
            json!({ "first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(
        resp.location.as_deref(),
        Some(format!("/profile/{}", user.username).as_str())
    );

    let resp = app
        .get(&format!("/profile/{}", user.username), None)
        .await;
    let body = resp.json();
    assert_eq!(body["profile"]["first_name"].as_str().unwrap(), "Ada");
    assert_eq!(body["profile"]["last_name"].as_str().unwrap(), "Lovelace");
}

#[tokio::test]
async fn renaming_redirects_to_the_new_username() {
    let app = app().await;
    let user = app.create_user("profile_rename").await;
    let new_name = format!("{}_renamed", user.username);

    let resp = app
        .post_json(
            "/profile/edit",
            json!({ "username": new_name }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(
        resp.location.as_deref(),
        Some(format!("/profile/{}", new_name).as_str())
    );

    let resp = app.get(&format!("/profile/{}", new_name), None).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn taken_username_is_a_validation_error() {
    let app = app().await;
    let user_a = app.create_user("profile_taken_a").await;
    let user_b = app.create_user("profile_taken_b").await;

    let resp = app
        .post_json(
            "/profile/edit",
            json!({ "username": user_a.username }),
            Some(&user_b.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let body = resp.json();
    assert_eq!(body["error"].as_str().unwrap(), "validation failed");
    assert_eq!(
        body["fields"]["username"].as_str().unwrap(),
        "username already taken"
    );
    assert!(body["form"].is_object());
}

#[tokio::test]
async fn blank_username_is_rejected() {
    let app = app().await;
    let user = app.create_user("profile_blank").await;

    let resp = app
        .post_json(
            "/profile/edit",
            json!({ "username": "   " }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["fields"]["username"].is_string());
}
