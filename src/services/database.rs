use anyhow::Result;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use super::history::SnapshotStorage;

/// PostgreSQL-backed snapshot storage: one row per key, overwritten on
/// every save.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let db = Database { pool };
        db.init_tables().await?;
        Ok(db)
    }

    async fn init_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS app_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SnapshotStorage for Database {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query("SELECT value FROM app_storage WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get(0));

        Ok(value)
    }

    async fn store(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO app_storage (key, value, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        log::debug!("💾 Stored '{}' snapshot ({} bytes)", key, value.len());
        Ok(())
    }
}
