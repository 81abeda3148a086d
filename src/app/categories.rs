use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::category::Category;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct CategoryService {
    db: Db,
}

impl CategoryService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Category pages only exist for published categories; a hidden one
    /// 404s exactly like a missing one.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, title, description, slug, is_published, created_at \
             FROM categories WHERE slug = $1 AND is_published",
        )
        .bind(slug)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, title, description, slug, is_published, created_at \
             FROM categories WHERE id = $1",
        )
        .bind(category_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Returns None when the slug is already taken.
    pub async fn create_category(
        &self,
        title: String,
        description: String,
        slug: String,
        is_published: bool,
    ) -> Result<Option<Category>> {
        let row = sqlx::query(
            "INSERT INTO categories (title, description, slug, is_published) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (slug) DO NOTHING \
             RETURNING id, title, description, slug, is_published, created_at",
        )
        .bind(title)
        .bind(description)
        .bind(slug)
        .bind(is_published)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }
}

fn category_from_row(row: &PgRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}
