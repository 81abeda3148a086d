//! Image upload tests. Need the S3-compatible endpoint from docker-compose
//! (localstack) like the rest of the integration suite needs Postgres.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use std::io::Cursor;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

fn tiny_png() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::new_rgba8(2, 2)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("failed to encode test png");
    buf.into_inner()
}

#[tokio::test]
async fn upload_png_and_attach_to_post() {
    let app = app().await;
    let user = app.create_user("image_upload").await;

    let resp = app
        .post_bytes("/images", tiny_png(), "image/png", Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    let image_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["width"].as_i64().unwrap(), 2);
    assert_eq!(body["height"].as_i64().unwrap(), 2);
    assert_eq!(body["content_type"].as_str().unwrap(), "image/png");
    assert!(body["url"].as_str().unwrap().contains("gazette-images-test"));

    let pub_date = (OffsetDateTime::now_utc() - Duration::hours(1))
        .format(&Rfc3339)
        .unwrap();
    let resp = app
        .post_json(
            "/posts/new",
            json!({
                "title": "With a picture",
                "body": "look",
                "pub_date": pub_date,
                "image_id": image_id,
            }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);

    let resp = app
        .get(&format!("/profile/{}", user.username), None)
        .await;
    let body = resp.json();
    let item = &body["items"][0];
    assert_eq!(item["image_id"].as_str().unwrap(), image_id);
    assert!(item["image_url"].as_str().unwrap().starts_with("http"));
}

#[tokio::test]
async fn garbage_bytes_are_not_an_image() {
    let app = app().await;
    let user = app.create_user("image_garbage").await;

    let resp = app
        .post_bytes(
            "/images",
            b"certainly not a png".to_vec(),
            "image/png",
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "unsupported or corrupt image");
}

#[tokio::test]
async fn upload_requires_login() {
    let app = app().await;

    let resp = app.post_bytes("/images", tiny_png(), "image/png", None).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/auth/login"));
}

#[tokio::test]
async fn posts_cannot_borrow_someone_elses_image() {
    let app = app().await;
    let owner = app.create_user("image_owner").await;
    let thief = app.create_user("image_thief").await;

    let resp = app
        .post_bytes("/images", tiny_png(), "image/png", Some(&owner.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let image_id = resp.json()["id"].as_str().unwrap().to_string();

    let pub_date = (OffsetDateTime::now_utc() - Duration::hours(1))
        .format(&Rfc3339)
        .unwrap();
    let resp = app
        .post_json(
            "/posts/new",
            json!({
                "title": "Borrowed",
                "body": "not mine",
                "pub_date": pub_date,
                "image_id": image_id,
            }),
            Some(&thief.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["fields"]["image_id"].is_string());
}
