use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::location::Location;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct LocationService {
    db: Db,
}

impl LocationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>> {
        let row = sqlx::query(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = $1",
        )
        .bind(location_id)
        .fetch_optional(self.db.pool())
        .await?;

        let location = row.map(|row| Location {
            id: row.get("id"),
            name: row.get("name"),
            is_published: row.get("is_published"),
            created_at: row.get("created_at"),
        });

        Ok(location)
    }

    pub async fn create_location(&self, name: String, is_published: bool) -> Result<Location> {
        let row = sqlx::query(
            "INSERT INTO locations (name, is_published) VALUES ($1, $2) \
             RETURNING id, name, is_published, created_at",
        )
        .bind(name)
        .bind(is_published)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Location {
            id: row.get("id"),
            name: row.get("name"),
            is_published: row.get("is_published"),
            created_at: row.get("created_at"),
        })
    }
}
