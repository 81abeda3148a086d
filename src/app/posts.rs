use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::infra::db::Db;

// Every post row travels with its author username, category and location
// names, and a comment count, so responses never need follow-up queries.
const POST_COLUMNS: &str = "p.id, p.author_id, u.username AS author_username, \
     p.title, p.body, p.is_published, p.pub_date, p.created_at, \
     p.category_id, c.title AS category_title, c.slug AS category_slug, \
     c.is_published AS category_is_published, \
     p.location_id, l.name AS location_name, p.image_id, \
     (SELECT count(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count";

const POST_JOINS: &str = "FROM posts p \
     JOIN users u ON p.author_id = u.id \
     LEFT JOIN categories c ON p.category_id = c.id \
     LEFT JOIN locations l ON p.location_id = l.id";

// The public filter: flag set, not scheduled for the future, category
// (when present) published as well. Listings use exactly this; the detail
// view layers the author override on top in the handler.
const PUBLIC_FILTER: &str =
    "p.is_published AND p.pub_date <= now() AND (p.category_id IS NULL OR c.is_published)";

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub image_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, author_id: Uuid, new_post: NewPost) -> Result<Post> {
        let row = sqlx::query(&format!(
            "WITH p AS ( \
                INSERT INTO posts (author_id, title, body, pub_date, is_published, \
                                   category_id, location_id, image_id) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                RETURNING * \
             ) \
             SELECT {} {}",
            POST_COLUMNS,
            POST_JOINS.replacen("FROM posts p", "FROM p", 1),
        ))
        .bind(author_id)
        .bind(new_post.title)
        .bind(new_post.body)
        .bind(new_post.pub_date)
        .bind(new_post.is_published)
        .bind(new_post.category_id)
        .bind(new_post.location_id)
        .bind(new_post.image_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(post_from_row(&row))
    }

    /// Unfiltered fetch. Readability is the caller's decision — the same
    /// row backs both the 404-for-strangers detail view and the author's
    /// own edit form.
    pub async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {} {} WHERE p.id = $1",
            POST_COLUMNS, POST_JOINS
        ))
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    pub async fn update_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        new_post: NewPost,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "WITH p AS ( \
                UPDATE posts \
                SET title = $3, body = $4, pub_date = $5, is_published = $6, \
                    category_id = $7, location_id = $8, image_id = $9 \
                WHERE id = $1 AND author_id = $2 \
                RETURNING * \
             ) \
             SELECT {} {}",
            POST_COLUMNS,
            POST_JOINS.replacen("FROM posts p", "FROM p", 1),
        ))
        .bind(post_id)
        .bind(author_id)
        .bind(new_post.title)
        .bind(new_post.body)
        .bind(new_post.pub_date)
        .bind(new_post.is_published)
        .bind(new_post.category_id)
        .bind(new_post.location_id)
        .bind(new_post.image_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Comments go with the post via ON DELETE CASCADE.
    pub async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_public(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT count(*) {} WHERE {}",
            POST_JOINS, PUBLIC_FILTER
        ))
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }

    pub async fn list_public(&self, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} {} WHERE {} ORDER BY p.pub_date DESC, p.id DESC LIMIT $1 OFFSET $2",
            POST_COLUMNS, POST_JOINS, PUBLIC_FILTER
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    pub async fn count_by_category(&self, category_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT count(*) {} WHERE p.category_id = $1 AND {}",
            POST_JOINS, PUBLIC_FILTER
        ))
        .bind(category_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }

    pub async fn list_by_category(
        &self,
        category_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} {} WHERE p.category_id = $1 AND {} \
             ORDER BY p.pub_date DESC, p.id DESC LIMIT $2 OFFSET $3",
            POST_COLUMNS, POST_JOINS, PUBLIC_FILTER
        ))
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// Profile listing. `include_hidden` is true only when the profile's
    /// owner is the one looking; everyone else gets the public filter.
    pub async fn count_by_author(&self, author_id: Uuid, include_hidden: bool) -> Result<i64> {
        let filter = author_filter(include_hidden);
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT count(*) {} WHERE p.author_id = $1 AND {}",
            POST_JOINS, filter
        ))
        .bind(author_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }

    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        include_hidden: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let filter = author_filter(include_hidden);
        let rows = sqlx::query(&format!(
            "SELECT {} {} WHERE p.author_id = $1 AND {} \
             ORDER BY p.pub_date DESC, p.id DESC LIMIT $2 OFFSET $3",
            POST_COLUMNS, POST_JOINS, filter
        ))
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }
}

fn author_filter(include_hidden: bool) -> &'static str {
    if include_hidden {
        "TRUE"
    } else {
        PUBLIC_FILTER
    }
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_username: Some(row.get("author_username")),
        title: row.get("title"),
        body: row.get("body"),
        is_published: row.get("is_published"),
        pub_date: row.get("pub_date"),
        created_at: row.get("created_at"),
        category_id: row.get("category_id"),
        category_title: row.get("category_title"),
        category_slug: row.get("category_slug"),
        category_is_published: row.get("category_is_published"),
        location_id: row.get("location_id"),
        location_name: row.get("location_name"),
        image_id: row.get("image_id"),
        image_url: None,
        comment_count: row.get("comment_count"),
    }
}
