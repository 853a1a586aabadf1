//! Database operations for the `prompt_results` table.
//!
//! Rows are append-only and keyed by `(run_id, prompt_id, engine)`; the
//! idempotency key that makes a retried Persisting step safe without locks.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use aivis_core::PromptResultSummary;

use crate::DbError;

/// A row from the `prompt_results` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptResultRow {
    pub id: i64,
    pub run_id: i64,
    pub prompt_id: i64,
    pub engine: String,
    pub mentioned: bool,
    pub sentiment: String,
    pub compound: f64,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

/// One point of a brand's visibility history: the mean pair score of one
/// completed run.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VisibilityPointRow {
    pub run_id: i64,
    pub completed_at: DateTime<Utc>,
    pub score: f64,
    pub result_count: i64,
}

/// Idempotent upsert of a run's summaries. Returns the number of rows
/// actually inserted; conflicts on the idempotency key are treated as
/// success, not errors.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a write fails for any other reason.
pub async fn upsert_prompt_results(
    pool: &PgPool,
    run_id: i64,
    summaries: &[PromptResultSummary],
) -> Result<u64, DbError> {
    let mut inserted = 0u64;
    for summary in summaries {
        let result = sqlx::query(
            "INSERT INTO prompt_results \
                 (run_id, prompt_id, engine, mentioned, sentiment, compound, score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (run_id, prompt_id, engine) DO NOTHING",
        )
        .bind(run_id)
        .bind(summary.prompt_id)
        .bind(&summary.engine)
        .bind(summary.mentioned)
        .bind(summary.sentiment.as_str())
        .bind(summary.compound)
        .bind(summary.score)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

/// All result rows for one run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_results_for_run(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<PromptResultRow>, DbError> {
    let rows = sqlx::query_as::<_, PromptResultRow>(
        "SELECT id, run_id, prompt_id, engine, mentioned, sentiment, compound, score, created_at \
         FROM prompt_results \
         WHERE run_id = $1 \
         ORDER BY prompt_id, engine",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-run mean visibility scores for a brand, newest completed run first.
///
/// This is the series the aggregator turns into current score, trend, and
/// ranking. Failed pairs simply have no row, so coverage gaps lower
/// `result_count` rather than skewing the mean with zeros.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn visibility_history(
    pool: &PgPool,
    brand_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<VisibilityPointRow>, DbError> {
    let rows = sqlx::query_as::<_, VisibilityPointRow>(
        "SELECT r.id AS run_id, r.completed_at, \
                AVG(p.score) AS score, COUNT(*) AS result_count \
         FROM analysis_runs r \
         JOIN prompt_results p ON p.run_id = r.id \
         WHERE r.brand_id = $1 AND r.status = 'completed' \
         GROUP BY r.id, r.completed_at \
         ORDER BY r.completed_at DESC, r.id DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(brand_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
