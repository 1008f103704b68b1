//! Activity persistence.
//!
//! Writes ranked activities keyed by `(user_id, activity_id, ts)` with a
//! TTL, and purges expired rows opportunistically on each write batch.
//! Persistence is best-effort from the pipeline's point of view: the
//! ingest response is valid whether or not the write succeeds.

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::models::Activity;

/// Store one ranked activity for a user at a capture timestamp.
pub async fn put_activity(
    pool: &SqlitePool,
    user_id: &str,
    ts: &str,
    activity: &Activity,
    ttl_days: i64,
) -> Result<()> {
    let expires_at = (Utc::now() + Duration::days(ttl_days)).timestamp();
    let next_actions_json = serde_json::to_string(&activity.next_actions)?;
    let tab_hashes_json = serde_json::to_string(&activity.tab_hashes)?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO activities
            (user_id, activity_id, ts, label, summary, confidence,
             next_actions_json, tab_hashes_json, is_active, rank, expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&activity.activity_id)
    .bind(ts)
    .bind(&activity.label)
    .bind(&activity.summary)
    .bind(activity.confidence)
    .bind(next_actions_json)
    .bind(tab_hashes_json)
    .bind(activity.is_active)
    .bind(activity.rank)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store a full ranked batch, then drop expired rows.
pub async fn put_activities(
    pool: &SqlitePool,
    user_id: &str,
    ts: &str,
    activities: &[Activity],
    ttl_days: i64,
) -> Result<usize> {
    for activity in activities {
        put_activity(pool, user_id, ts, activity, ttl_days).await?;
    }
    purge_expired(pool).await?;
    Ok(activities.len())
}

/// Delete rows past their TTL. Returns the number removed.
pub async fn purge_expired(pool: &SqlitePool) -> Result<u64> {
    let now = Utc::now().timestamp();
    let result = sqlx::query("DELETE FROM activities WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
