//! Database operations for `analysis_runs` and `run_checkpoints`.
//!
//! Status transitions are guarded compare-and-swap updates: the `WHERE
//! status = $from` clause means two workers racing over the same run cannot
//! both win a transition, and a replayed step observes the conflict instead
//! of corrupting state.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `analysis_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub brand_id: i64,
    pub domain: String,
    pub requester_email: String,
    pub status: String,
    pub failed_step: Option<String>,
    pub error_message: Option<String>,
    pub degraded: bool,
    pub cancel_requested: bool,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, brand_id, domain, requester_email, status, \
     failed_step, error_message, degraded, cancel_requested, \
     submitted_at, started_at, completed_at, created_at";

/// Create a run in `queued` status with a fresh public id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_analysis_run(
    pool: &PgPool,
    brand_id: i64,
    domain: &str,
    requester_email: &str,
    submitted_at: DateTime<Utc>,
) -> Result<AnalysisRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, AnalysisRunRow>(&format!(
        "INSERT INTO analysis_runs (public_id, brand_id, domain, requester_email, submitted_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(brand_id)
    .bind(domain)
    .bind(requester_email)
    .bind(submitted_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Move a run from `from` to `to`, stamping `started_at`/`completed_at`
/// where the target state warrants it.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not currently in
/// `from`; the caller lost the race or is replaying a finished step.
pub async fn transition_run(
    pool: &PgPool,
    run_id: i64,
    from: &str,
    to: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE analysis_runs SET status = $1, \
             started_at = CASE WHEN $1 = 'analyzing' THEN NOW() ELSE started_at END, \
             completed_at = CASE WHEN $1 IN ('completed', 'cancelled') THEN NOW() ELSE completed_at END \
         WHERE id = $2 AND status = $3",
    )
    .bind(to)
    .bind(run_id)
    .bind(from)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id: run_id,
            expected_status: from.to_string(),
        });
    }

    Ok(())
}

/// Mark a run terminally failed at `step`, recording the error for replay.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_run_failed(
    pool: &PgPool,
    run_id: i64,
    step: &str,
    error_message: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE analysis_runs \
         SET status = 'failed', failed_step = $1, error_message = $2, completed_at = NOW() \
         WHERE id = $3",
    )
    .bind(step)
    .bind(error_message)
    .bind(run_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Flag a run as degraded (notification exhausted) without failing it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_run_degraded(pool: &PgPool, run_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE analysis_runs SET degraded = TRUE WHERE id = $1")
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Ask a running run to stop at its next step boundary.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the run does not exist or is already
/// terminal.
pub async fn request_cancel(pool: &PgPool, run_id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE analysis_runs SET cancel_requested = TRUE \
         WHERE id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')",
    )
    .bind(run_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the run does not exist.
pub async fn run_cancel_requested(pool: &PgPool, run_id: i64) -> Result<bool, DbError> {
    sqlx::query_scalar::<_, bool>("SELECT cancel_requested FROM analysis_runs WHERE id = $1")
        .bind(run_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has the given internal id.
pub async fn get_run(pool: &PgPool, run_id: i64) -> Result<AnalysisRunRow, DbError> {
    sqlx::query_as::<_, AnalysisRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM analysis_runs WHERE id = $1"
    ))
    .bind(run_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has the given public id.
pub async fn get_run_by_public_id(pool: &PgPool, public_id: Uuid) -> Result<AnalysisRunRow, DbError> {
    sqlx::query_as::<_, AnalysisRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM analysis_runs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// The most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_runs(pool: &PgPool, limit: i64) -> Result<Vec<AnalysisRunRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalysisRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM analysis_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Non-terminal runs a restarted process should pick back up.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_resumable_runs(pool: &PgPool) -> Result<Vec<AnalysisRunRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalysisRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM analysis_runs \
         WHERE status NOT IN ('completed', 'failed', 'cancelled') \
         ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

/// Store the payload a completed step produced, replacing any prior attempt.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn save_checkpoint(
    pool: &PgPool,
    run_id: i64,
    step: &str,
    payload: &Value,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO run_checkpoints (run_id, step, payload) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (run_id, step) DO UPDATE SET payload = EXCLUDED.payload",
    )
    .bind(run_id)
    .bind(step)
    .bind(payload)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a step's checkpoint payload, if any attempt completed before.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_checkpoint(
    pool: &PgPool,
    run_id: i64,
    step: &str,
) -> Result<Option<Value>, DbError> {
    let payload = sqlx::query_scalar::<_, Value>(
        "SELECT payload FROM run_checkpoints WHERE run_id = $1 AND step = $2",
    )
    .bind(run_id)
    .bind(step)
    .fetch_optional(pool)
    .await?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brands::find_or_create_brand_by_domain;

    async fn seed_run(pool: &PgPool) -> AnalysisRunRow {
        let brand = find_or_create_brand_by_domain(pool, "example.com")
            .await
            .expect("brand");
        create_analysis_run(pool, brand.id, "example.com", "dev@example.com", Utc::now())
            .await
            .expect("run")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn new_runs_start_queued(pool: PgPool) {
        let run = seed_run(&pool).await;
        assert_eq!(run.status, "queued");
        assert!(run.started_at.is_none());
        assert!(!run.degraded);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn transition_requires_the_expected_source_state(pool: PgPool) {
        let run = seed_run(&pool).await;

        transition_run(&pool, run.id, "queued", "analyzing")
            .await
            .expect("queued -> analyzing");

        // Re-running the same transition loses the CAS.
        let err = transition_run(&pool, run.id, "queued", "analyzing")
            .await
            .expect_err("replay must fail");
        assert!(matches!(err, DbError::InvalidRunTransition { .. }));

        let row = get_run(&pool, run.id).await.expect("fetch");
        assert_eq!(row.status, "analyzing");
        assert!(row.started_at.is_some());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn completed_runs_get_a_completion_timestamp(pool: PgPool) {
        let run = seed_run(&pool).await;
        transition_run(&pool, run.id, "queued", "analyzing")
            .await
            .expect("t1");
        transition_run(&pool, run.id, "analyzing", "persisting")
            .await
            .expect("t2");
        transition_run(&pool, run.id, "persisting", "notifying")
            .await
            .expect("t3");
        transition_run(&pool, run.id, "notifying", "completed")
            .await
            .expect("t4");

        let row = get_run(&pool, run.id).await.expect("fetch");
        assert_eq!(row.status, "completed");
        assert!(row.completed_at.is_some());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn failed_runs_record_the_step_and_error(pool: PgPool) {
        let run = seed_run(&pool).await;
        mark_run_failed(&pool, run.id, "persist", "store unavailable")
            .await
            .expect("fail");

        let row = get_run(&pool, run.id).await.expect("fetch");
        assert_eq!(row.status, "failed");
        assert_eq!(row.failed_step.as_deref(), Some("persist"));
        assert_eq!(row.error_message.as_deref(), Some("store unavailable"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn checkpoints_replace_prior_attempts(pool: PgPool) {
        let run = seed_run(&pool).await;

        save_checkpoint(&pool, run.id, "analyze", &serde_json::json!({"v": 1}))
            .await
            .expect("save");
        save_checkpoint(&pool, run.id, "analyze", &serde_json::json!({"v": 2}))
            .await
            .expect("replace");

        let payload = load_checkpoint(&pool, run.id, "analyze")
            .await
            .expect("load")
            .expect("present");
        assert_eq!(payload["v"], 2);

        assert!(load_checkpoint(&pool, run.id, "persist")
            .await
            .expect("load")
            .is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn resumable_listing_skips_terminal_runs(pool: PgPool) {
        let run = seed_run(&pool).await;
        let resumable = list_resumable_runs(&pool).await.expect("list");
        assert_eq!(resumable.len(), 1);

        mark_run_failed(&pool, run.id, "analyze", "boom")
            .await
            .expect("fail");
        let resumable = list_resumable_runs(&pool).await.expect("list");
        assert!(resumable.is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn cancel_request_is_visible_to_the_worker(pool: PgPool) {
        let run = seed_run(&pool).await;
        assert!(!run_cancel_requested(&pool, run.id).await.expect("flag"));

        request_cancel(&pool, run.id).await.expect("request");
        assert!(run_cancel_requested(&pool, run.id).await.expect("flag"));
    }
}
