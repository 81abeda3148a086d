use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct PostImage {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(skip_serializing)]
    pub object_key: String,
    pub content_type: String,
    pub width: i32,
    pub height: i32,
    pub bytes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Public URL (populated at response time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
