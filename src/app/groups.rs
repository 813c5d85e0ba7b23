use anyhow::Result;
use sqlx::Row;

use crate::domain::group::Group;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct GroupService {
    db: Db,
}

impl GroupService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates a group. Returns `None` when the slug is taken.
    pub async fn create(
        &self,
        title: String,
        slug: String,
        description: String,
    ) -> Result<Option<Group>> {
        let row = sqlx::query(
            "INSERT INTO groups (title, slug, description) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (slug) DO NOTHING \
             RETURNING id, title, slug, description, created_at",
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(group_from_row))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let row = sqlx::query(
            "SELECT id, title, slug, description, created_at FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(group_from_row))
    }

    /// Deletes a group. Posts keep living with their group reference nulled
    /// by the ON DELETE SET NULL policy.
    pub async fn delete_by_slug(&self, slug: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM groups WHERE slug = $1")
            .bind(slug)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn group_from_row(row: sqlx::postgres::PgRow) -> Group {
    Group {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}
