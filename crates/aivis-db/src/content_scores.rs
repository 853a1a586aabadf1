//! Database operations for the `content_scores` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `content_scores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentScoreRow {
    pub id: i64,
    pub url: String,
    pub composite_score: f64,
    pub readability_ease: f64,
    pub sentiment_favorability: f64,
    pub subscores: Value,
    pub scored_at: DateTime<Utc>,
}

const SCORE_COLUMNS: &str =
    "id, url, composite_score, readability_ease, sentiment_favorability, subscores, scored_at";

/// Append one scoring result. Each invocation is a new history point;
/// `(url, scored_at)` is the idempotency key for retried writes.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_content_score(
    pool: &PgPool,
    url: &str,
    composite_score: f64,
    readability_ease: f64,
    sentiment_favorability: f64,
    subscores: &Value,
    scored_at: DateTime<Utc>,
) -> Result<ContentScoreRow, DbError> {
    let row = sqlx::query_as::<_, ContentScoreRow>(&format!(
        "INSERT INTO content_scores \
             (url, composite_score, readability_ease, sentiment_favorability, subscores, scored_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (url, scored_at) DO UPDATE SET url = EXCLUDED.url \
         RETURNING {SCORE_COLUMNS}"
    ))
    .bind(url)
    .bind(composite_score)
    .bind(readability_ease)
    .bind(sentiment_favorability)
    .bind(subscores)
    .bind(scored_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Scoring history, newest first, paginated by `limit`/`offset`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content_scores(
    pool: &PgPool,
    url: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ContentScoreRow>, DbError> {
    let rows = match url {
        Some(url) => {
            sqlx::query_as::<_, ContentScoreRow>(&format!(
                "SELECT {SCORE_COLUMNS} FROM content_scores \
                 WHERE url = $1 \
                 ORDER BY scored_at DESC, id DESC \
                 LIMIT $2 OFFSET $3"
            ))
            .bind(url)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, ContentScoreRow>(&format!(
                "SELECT {SCORE_COLUMNS} FROM content_scores \
                 ORDER BY scored_at DESC, id DESC \
                 LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
