use anyhow::Result;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use image::ImageFormat;
use sqlx::Row;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::image::PostImage;
use crate::domain::post::Post;
use crate::infra::{db::Db, storage::ObjectStorage};

#[derive(Clone)]
pub struct ImageService {
    db: Db,
    storage: ObjectStorage,
    url_ttl_seconds: u64,
}

impl ImageService {
    pub fn new(db: Db, storage: ObjectStorage, url_ttl_seconds: u64) -> Self {
        Self {
            db,
            storage,
            url_ttl_seconds,
        }
    }

    /// Validate and store an uploaded image. Returns None when the bytes
    /// are not a decodable JPEG/PNG/WebP — the caller turns that into a
    /// validation error, not a server error.
    pub async fn upload(&self, owner_id: Uuid, data: Bytes) -> Result<Option<PostImage>> {
        let (ext, content_type) = match image::guess_format(&data) {
            Ok(ImageFormat::Jpeg) => ("jpg", "image/jpeg"),
            Ok(ImageFormat::Png) => ("png", "image/png"),
            Ok(ImageFormat::WebP) => ("webp", "image/webp"),
            _ => return Ok(None),
        };
        let decoded = match image::load_from_memory(&data) {
            Ok(decoded) => decoded,
            Err(_) => return Ok(None),
        };

        let image_id = Uuid::new_v4();
        let object_key = format!("posts/{}/{}.{}", owner_id, image_id, ext);
        let byte_count = data.len() as i64;

        self.storage
            .client()
            .put_object()
            .bucket(self.storage.bucket())
            .key(&object_key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await?;

        let row = sqlx::query(
            "INSERT INTO post_images (id, owner_id, object_key, content_type, width, height, bytes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, owner_id, object_key, content_type, width, height, bytes, created_at",
        )
        .bind(image_id)
        .bind(owner_id)
        .bind(&object_key)
        .bind(content_type)
        .bind(decoded.width() as i32)
        .bind(decoded.height() as i32)
        .bind(byte_count)
        .fetch_one(self.db.pool())
        .await?;

        let url = self.object_url(&object_key).await?;
        let mut stored = image_from_row(&row);
        stored.url = Some(url);
        Ok(Some(stored))
    }

    /// Posts may only reference images their author uploaded.
    pub async fn get_owned(&self, image_id: Uuid, owner_id: Uuid) -> Result<Option<PostImage>> {
        let row = sqlx::query(
            "SELECT id, owner_id, object_key, content_type, width, height, bytes, created_at \
             FROM post_images WHERE id = $1 AND owner_id = $2",
        )
        .bind(image_id)
        .bind(owner_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(image_from_row))
    }

    /// Resolve image URLs for a batch of posts with one key lookup and
    /// parallel presigning.
    pub async fn attach_post_urls(&self, posts: &mut [Post]) -> Result<()> {
        let image_ids: Vec<Uuid> = posts.iter().filter_map(|post| post.image_id).collect();
        if image_ids.is_empty() {
            return Ok(());
        }

        let rows = sqlx::query("SELECT id, object_key FROM post_images WHERE id = ANY($1)")
            .bind(&image_ids)
            .fetch_all(self.db.pool())
            .await?;

        let keys: HashMap<Uuid, String> = rows
            .iter()
            .map(|row| (row.get("id"), row.get("object_key")))
            .collect();

        let url_futures = keys
            .iter()
            .map(|(id, key)| async move { (*id, self.object_url(key).await) });
        let urls: HashMap<Uuid, String> = futures::future::join_all(url_futures)
            .await
            .into_iter()
            .filter_map(|(id, url)| url.ok().map(|url| (id, url)))
            .collect();

        for post in posts.iter_mut() {
            if let Some(image_id) = post.image_id {
                post.image_url = urls.get(&image_id).cloned();
            }
        }

        Ok(())
    }

    pub async fn attach_url(&self, post: &mut Post) -> Result<()> {
        if let Some(image_id) = post.image_id {
            let row = sqlx::query("SELECT object_key FROM post_images WHERE id = $1")
                .bind(image_id)
                .fetch_optional(self.db.pool())
                .await?;
            if let Some(row) = row {
                let key: String = row.get("object_key");
                post.image_url = Some(self.object_url(&key).await?);
            }
        }
        Ok(())
    }

    async fn object_url(&self, object_key: &str) -> Result<String> {
        let presign_config =
            PresigningConfig::expires_in(Duration::from_secs(self.url_ttl_seconds))?;
        let presigned = self
            .storage
            .client()
            .get_object()
            .bucket(self.storage.bucket())
            .key(object_key)
            .presigned(presign_config)
            .await?;
        self.storage.rewrite_public(presigned.uri())
    }
}

fn image_from_row(row: &sqlx::postgres::PgRow) -> PostImage {
    PostImage {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        object_key: row.get("object_key"),
        content_type: row.get("content_type"),
        width: row.get("width"),
        height: row.get("height"),
        bytes: row.get("bytes"),
        created_at: row.get("created_at"),
        url: None,
    }
}
