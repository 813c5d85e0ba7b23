use anyhow::Result;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::app::posts::{post_from_row, POST_COLUMNS};
use crate::domain::post::Post;
use crate::infra::{cache::RedisCache, db::Db};

/// One page of a feed. Out-of-range page requests clamp to the nearest
/// valid page instead of erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<Post>,
    pub page: i64,
    pub total_pages: i64,
    pub count: i64,
}

#[derive(Clone)]
pub struct FeedService {
    db: Db,
    cache: RedisCache,
}

impl FeedService {
    pub fn new(db: Db, cache: RedisCache) -> Self {
        Self { db, cache }
    }

    /// Home feed: every post, newest first. The assembled page is cached in
    /// Redis for a short TTL keyed by the clamped page number, absorbing
    /// read spikes on the landing page. TTL zero disables the cache.
    pub async fn home(&self, page: Option<i64>, limit: i64, cache_ttl: u64) -> Result<FeedPage> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.db.pool())
            .await?;
        let (page, total_pages) = clamp_page(page, count, limit);

        // Keyed by the clamped page, so aliases of the same page (`?page=0`
        // and `?page=1`, say) share one cache entry.
        let cache_key = format!("feed:index:{}", page);

        if cache_ttl > 0 {
            if let Ok(mut conn) = self.cache.conn().await {
                if let Ok(Some(payload)) = conn.get::<_, Option<String>>(&cache_key).await {
                    if let Ok(feed) = serde_json::from_str::<FeedPage>(&payload) {
                        return Ok(feed);
                    }
                }
            }
        }

        let rows = sqlx::query(&format!(
            "SELECT {} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $1 OFFSET $2",
            POST_COLUMNS
        ))
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(self.db.pool())
        .await?;

        let feed = FeedPage {
            items: rows.iter().map(post_from_row).collect(),
            page,
            total_pages,
            count,
        };

        if cache_ttl > 0 {
            if let Ok(mut conn) = self.cache.conn().await {
                if let Ok(payload) = serde_json::to_string(&feed) {
                    if let Err(err) = conn.set_ex::<_, _, ()>(&cache_key, payload, cache_ttl).await
                    {
                        warn!(error = ?err, "failed to write index cache");
                    }
                }
            }
        }

        Ok(feed)
    }

    /// Posts of a single group, newest first.
    pub async fn group(&self, group_id: Uuid, page: Option<i64>, limit: i64) -> Result<FeedPage> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(self.db.pool())
            .await?;
        let (page, total_pages) = clamp_page(page, count, limit);

        let rows = sqlx::query(&format!(
            "SELECT {} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.group_id = $1 \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
            POST_COLUMNS
        ))
        .bind(group_id)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(FeedPage {
            items: rows.iter().map(post_from_row).collect(),
            page,
            total_pages,
            count,
        })
    }

    /// Posts authored by a single user, newest first.
    pub async fn profile(
        &self,
        author_id: Uuid,
        page: Option<i64>,
        limit: i64,
    ) -> Result<FeedPage> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.db.pool())
            .await?;
        let (page, total_pages) = clamp_page(page, count, limit);

        let rows = sqlx::query(&format!(
            "SELECT {} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.author_id = $1 \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
            POST_COLUMNS
        ))
        .bind(author_id)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(FeedPage {
            items: rows.iter().map(post_from_row).collect(),
            page,
            total_pages,
            count,
        })
    }

    /// Posts whose author is followed by the requester, newest first.
    pub async fn following(
        &self,
        user_id: Uuid,
        page: Option<i64>,
        limit: i64,
    ) -> Result<FeedPage> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts \
             WHERE author_id IN (SELECT author_id FROM follows WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;
        let (page, total_pages) = clamp_page(page, count, limit);

        let rows = sqlx::query(&format!(
            "SELECT {} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1) \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
            POST_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(FeedPage {
            items: rows.iter().map(post_from_row).collect(),
            page,
            total_pages,
            count,
        })
    }
}

/// Page clamp: an empty feed is a single empty page, anything past the end
/// returns the last page, anything below 1 returns the first.
fn clamp_page(requested: Option<i64>, count: i64, limit: i64) -> (i64, i64) {
    let total_pages = if count == 0 {
        1
    } else {
        (count + limit - 1) / limit
    };
    let page = requested.unwrap_or(1).clamp(1, total_pages);
    (page, total_pages)
}

#[cfg(test)]
mod tests {
    use super::clamp_page;

    #[test]
    fn clamp_page_basics() {
        // 12 items at 10 per page: two pages
        assert_eq!(clamp_page(None, 12, 10), (1, 2));
        assert_eq!(clamp_page(Some(2), 12, 10), (2, 2));
        assert_eq!(clamp_page(Some(99), 12, 10), (2, 2));
        assert_eq!(clamp_page(Some(0), 12, 10), (1, 2));
        assert_eq!(clamp_page(Some(-3), 12, 10), (1, 2));
    }

    #[test]
    fn clamp_page_empty_feed() {
        assert_eq!(clamp_page(None, 0, 10), (1, 1));
        assert_eq!(clamp_page(Some(5), 0, 10), (1, 1));
    }

    #[test]
    fn clamp_page_exact_multiple() {
        assert_eq!(clamp_page(Some(2), 20, 10), (2, 2));
        assert_eq!(clamp_page(Some(3), 20, 10), (2, 2));
    }
}
