pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{cache::RedisCache, db::Db};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub posts_limit: i64,
    pub index_cache_ttl_seconds: u64,
    pub session_ttl_hours: u64,
    pub admin_token: Option<String>,
}
