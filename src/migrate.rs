use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Activities table: one row per (user, activity, capture timestamp)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            user_id TEXT NOT NULL,
            activity_id TEXT NOT NULL,
            ts TEXT NOT NULL,
            label TEXT NOT NULL DEFAULT '',
            summary TEXT NOT NULL DEFAULT '',
            confidence REAL NOT NULL DEFAULT 0,
            next_actions_json TEXT NOT NULL DEFAULT '[]',
            tab_hashes_json TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 0,
            rank INTEGER NOT NULL DEFAULT 0,
            expires_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, activity_id, ts)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_activities_user_ts ON activities(user_id, ts DESC)",
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_activities_expires ON activities(expires_at)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
