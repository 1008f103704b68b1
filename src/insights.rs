//! Insight retrieval: recent activities per user, newest first.
//!
//! Used by both the `alens insights` CLI command and `GET /insights`.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Hard ceiling on the per-request result count.
const MAX_LIMIT: i64 = 50;
const DEFAULT_LIMIT: i64 = 5;

/// A stored activity as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct InsightItem {
    pub ts: String,
    pub activity_id: String,
    pub label: String,
    pub summary: String,
    pub next_actions: serde_json::Value,
    pub confidence: f64,
    pub is_active: bool,
    pub rank: i64,
}

/// Response body for an insights query.
#[derive(Debug, Clone, Serialize)]
pub struct InsightsResponse {
    pub ok: bool,
    pub items: Vec<InsightItem>,
}

/// Clamp a requested limit into `[1, 50]`, defaulting to 5.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Fetch the most recent activities for a user, newest capture first and
/// best rank first within a capture. Expired rows are excluded; `since`
/// (ISO-8601) filters to captures at or after that instant.
pub async fn latest_activities(
    pool: &SqlitePool,
    user_id: &str,
    limit: Option<i64>,
    since: Option<&str>,
) -> Result<InsightsResponse> {
    let limit = clamp_limit(limit);
    let now = chrono::Utc::now().timestamp();

    let rows = match since.filter(|s| !s.is_empty()) {
        Some(since) => {
            sqlx::query(
                r#"
                SELECT ts, activity_id, label, summary, confidence,
                       next_actions_json, is_active, rank
                FROM activities
                WHERE user_id = ? AND expires_at > ? AND ts >= ?
                ORDER BY ts DESC, rank ASC
                LIMIT ?
                "#,
            )
            .bind(user_id)
            .bind(now)
            .bind(since)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT ts, activity_id, label, summary, confidence,
                       next_actions_json, is_active, rank
                FROM activities
                WHERE user_id = ? AND expires_at > ?
                ORDER BY ts DESC, rank ASC
                LIMIT ?
                "#,
            )
            .bind(user_id)
            .bind(now)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    let items = rows
        .iter()
        .map(|row| {
            let next_actions_json: String = row.get("next_actions_json");
            InsightItem {
                ts: row.get("ts"),
                activity_id: row.get("activity_id"),
                label: row.get("label"),
                summary: row.get("summary"),
                next_actions: serde_json::from_str(&next_actions_json)
                    .unwrap_or(serde_json::json!([])),
                confidence: row.get("confidence"),
                is_active: row.get("is_active"),
                rank: row.get("rank"),
            }
        })
        .collect();

    Ok(InsightsResponse { ok: true, items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_clamped_to_valid_range() {
        assert_eq!(clamp_limit(None), 5);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-3)), 1);
        assert_eq!(clamp_limit(Some(10)), 10);
        assert_eq!(clamp_limit(Some(500)), 50);
    }
}
