use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::comment::Comment;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Author and post always come from the session and the path, never
    /// from the submitted form.
    pub async fn add_comment(&self, post_id: Uuid, author_id: Uuid, body: String) -> Result<Comment> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO comments (post_id, author_id, body) \
                VALUES ($1, $2, $3) \
                RETURNING id, post_id, author_id, body, created_at \
             ) \
             SELECT i.*, u.username AS author_username \
             FROM inserted i JOIN users u ON i.author_id = u.id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        Ok(comment_from_row(&row))
    }

    /// Looked up by the (post, comment) pair; a comment reached through
    /// the wrong post's URL does not exist.
    pub async fn get_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, c.body, c.created_at, \
                    u.username AS author_username \
             FROM comments c JOIN users u ON c.author_id = u.id \
             WHERE c.id = $1 AND c.post_id = $2",
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    pub async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
        body: String,
    ) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "WITH updated AS ( \
                UPDATE comments SET body = $4 \
                WHERE id = $1 AND post_id = $2 AND author_id = $3 \
                RETURNING id, post_id, author_id, body, created_at \
             ) \
             SELECT u2.*, u.username AS author_username \
             FROM updated u2 JOIN users u ON u2.author_id = u.id",
        )
        .bind(comment_id)
        .bind(post_id)
        .bind(author_id)
        .bind(body)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    pub async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM comments WHERE id = $1 AND post_id = $2 AND author_id = $3")
                .bind(comment_id)
                .bind(post_id)
                .bind(author_id)
                .execute(self.db.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Conversation order, oldest first. The detail page shows the whole
    /// thread, so there is no pagination here.
    pub async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, c.body, c.created_at, \
                    u.username AS author_username \
             FROM comments c JOIN users u ON c.author_id = u.id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        author_username: Some(row.get("author_username")),
        body: row.get("body"),
        created_at: row.get("created_at"),
    }
}
