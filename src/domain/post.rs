use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: Option<String>,
    pub title: String,
    pub body: String,
    pub is_published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub category_id: Option<Uuid>,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    /// Publication state of the referenced category; None when uncategorized.
    #[serde(default, skip_serializing)]
    pub category_is_published: Option<bool>,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub image_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(skip_deserializing)]
    pub image_url: Option<String>,
    pub comment_count: i64,
}
