use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

pub enum ProfileUpdate {
    Updated(User),
    UsernameTaken,
    NotFound,
}

#[derive(Clone)]
pub struct ProfileService {
    db: Db,
}

impl ProfileService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, first_name, last_name, created_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, first_name, last_name, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Partial update: absent fields keep their current value.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        username: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<String>,
    ) -> Result<ProfileUpdate> {
        if let Some(username) = &username {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id <> $2)",
            )
            .bind(username)
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
            if taken {
                return Ok(ProfileUpdate::UsernameTaken);
            }
        }

        let row = sqlx::query(
            "UPDATE users \
             SET username = COALESCE($2, username), \
                 first_name = COALESCE($3, first_name), \
                 last_name = COALESCE($4, last_name), \
                 email = COALESCE($5, email) \
             WHERE id = $1 \
             RETURNING id, username, email, first_name, last_name, created_at",
        )
        .bind(user_id)
        .bind(username)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(match row {
            Some(row) => ProfileUpdate::Updated(user_from_row(&row)),
            None => ProfileUpdate::NotFound,
        })
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        created_at: row.get("created_at"),
    }
}
