use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

/// Resolved identity of the requester holding a valid session token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub username: String,
}

/// A freshly issued session. The raw token is returned to the client once;
/// only its sha256 digest is stored.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    session_ttl_hours: u64,
}

impl AuthService {
    pub fn new(db: Db, session_ttl_hours: u64) -> Self {
        Self {
            db,
            session_ttl_hours,
        }
    }

    /// Registers a new user. Returns `None` when the username is taken.
    pub async fn signup(&self, username: String, password: String) -> Result<Option<User>> {
        let password_hash = hash_password(&password)?;
        let row = sqlx::query(
            "INSERT INTO users (username, password_hash) \
             VALUES ($1, $2) \
             ON CONFLICT (username) DO NOTHING \
             RETURNING id, username, created_at",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            username: row.get("username"),
            created_at: row.get("created_at"),
        }))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user_id: Uuid = row.get("id");
        let password_hash: String = row.get("password_hash");
        if !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let session = self.issue_session(user_id).await?;
        Ok(Some(session))
    }

    pub async fn issue_session(&self, user_id: Uuid) -> Result<Session> {
        let mut raw = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        let token = hex::encode(raw);

        let ttl = i64::try_from(self.session_ttl_hours)
            .map_err(|_| anyhow!("session ttl out of range"))?;
        let expires_at = OffsetDateTime::now_utc() + Duration::hours(ttl);

        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(expires_at)
        .execute(self.db.pool())
        .await?;

        Ok(Session { token, expires_at })
    }

    pub async fn authenticate(&self, token: &str) -> Result<Option<AuthSession>> {
        let row = sqlx::query(
            "SELECT s.user_id, u.username \
             FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token_hash = $1 AND s.expires_at > now()",
        )
        .bind(hash_token(token))
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| AuthSession {
            user_id: row.get("user_id"),
            username: row.get("username"),
        }))
    }

    pub async fn revoke_session(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = match PasswordHash::new(password_hash) {
        Ok(parsed) => parsed,
        Err(_) => return Ok(false),
    };
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
