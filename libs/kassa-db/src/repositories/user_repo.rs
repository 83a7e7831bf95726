use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::models::{Amount, User};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &PgRow) -> User {
        let amount = |column: &str| {
            row.try_get::<i64, _>(column)
                .ok()
                .and_then(|v| Amount::from_kopecks(v).ok())
                .unwrap_or_default()
        };
        User {
            tg_id: row.try_get::<i64, _>("tg_id").unwrap_or_default(),
            username: row.try_get::<Option<String>, _>("username").ok().flatten(),
            full_name: row.try_get::<Option<String>, _>("full_name").ok().flatten(),
            balance: amount("balance"),
            total_refill: amount("total_refill"),
            referrer: row.try_get::<Option<String>, _>("referrer").ok().flatten(),
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .unwrap_or_else(|_| Utc::now()),
        }
    }

    pub async fn get_by_tg_id(&self, tg_id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE tg_id = $1")
            .bind(tg_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by TG ID")?;
        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    pub async fn upsert(
        &self,
        tg_id: i64,
        username: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (tg_id, username, full_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (tg_id) DO UPDATE SET
                username = COALESCE(EXCLUDED.username, users.username),
                full_name = COALESCE(EXCLUDED.full_name, users.full_name),
                last_seen = CURRENT_TIMESTAMP
            RETURNING *
            "#,
        )
        .bind(tg_id)
        .bind(username)
        .bind(full_name)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert user")?;
        Ok(Self::row_to_user(&row))
    }

    /// Stores the referrer only if none is set yet. Returns whether it was stored.
    pub async fn set_referrer(&self, tg_id: i64, referrer: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET referrer = $1 WHERE tg_id = $2 AND referrer IS NULL",
        )
        .bind(referrer)
        .bind(tg_id)
        .execute(&self.pool)
        .await
        .context("Failed to set referrer")?;
        Ok(result.rows_affected() > 0)
    }
}
