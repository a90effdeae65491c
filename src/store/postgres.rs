use async_trait::async_trait;
use sqlx::PgPool;

use super::{NewUser, UserRecord, UserStore};
use crate::error::DatabaseError;

/// Postgres-backed user store. Schema lives in `migrations/`.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT uid, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(uid, username, password_hash)| UserRecord {
            uid,
            username,
            password_hash,
        }))
    }

    async fn find_by_id(&self, uid: i64) -> Result<Option<UserRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT uid, username, password_hash FROM users WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(uid, username, password_hash)| UserRecord {
            uid,
            username,
            password_hash,
        }))
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, DatabaseError> {
        let uid = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES ($1, $2, $3)
            RETURNING uid
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(UserRecord {
            uid,
            username: user.username,
            password_hash: user.password_hash,
        })
    }
}
