use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::infra::db::Db;

/// Columns every post query selects; keep in sync with [`post_from_row`].
pub(crate) const POST_COLUMNS: &str =
    "p.id, p.author_id, u.username AS author_username, p.group_id, \
     g.slug AS group_slug, p.body, p.image_key, p.created_at";

pub(crate) fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        group_id: row.get("group_id"),
        group_slug: row.get("group_slug"),
        text: row.get("body"),
        image: row.get("image_key"),
        created_at: row.get("created_at"),
    }
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        text: String,
        group_id: Option<Uuid>,
        image: Option<String>,
    ) -> Result<Post> {
        let row = sqlx::query(&format!(
            "WITH inserted AS ( \
                INSERT INTO posts (author_id, body, group_id, image_key) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id, author_id, group_id, body, image_key, created_at \
             ) \
             SELECT {} \
             FROM inserted p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id",
            POST_COLUMNS
        ))
        .bind(author_id)
        .bind(text)
        .bind(group_id)
        .bind(image)
        .fetch_one(self.db.pool())
        .await?;

        Ok(post_from_row(&row))
    }

    /// Composite lookup by (author username, post id), the shape posts are
    /// addressed with in URLs.
    pub async fn get(&self, username: &str, post_id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.id = $1 AND u.username = $2",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| post_from_row(&row)))
    }

    /// Rewrites text/group/image in place. The author and creation timestamp
    /// are never touched.
    pub async fn update(
        &self,
        post_id: i64,
        text: String,
        group_id: Option<Uuid>,
        image: Option<String>,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "WITH updated AS ( \
                UPDATE posts \
                SET body = $2, group_id = $3, image_key = $4 \
                WHERE id = $1 \
                RETURNING id, author_id, group_id, body, image_key, created_at \
             ) \
             SELECT {} \
             FROM updated p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(text)
        .bind(group_id)
        .bind(image)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| post_from_row(&row)))
    }
}
