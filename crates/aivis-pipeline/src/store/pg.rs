//! Postgres-backed [`RunStore`] delegating to `aivis-db`.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use sqlx::PgPool;

use aivis_core::PromptResultSummary;

use crate::store::{RunStore, StoreError};
use crate::types::{RunRecord, RunState, RunStep};

#[derive(Debug, Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db(err: aivis_db::DbError) -> StoreError {
    match err {
        aivis_db::DbError::NotFound => StoreError::NotFound,
        aivis_db::DbError::InvalidRunTransition {
            id,
            expected_status,
        } => StoreError::InvalidTransition {
            id,
            expected_state: expected_status,
        },
        other => StoreError::Db(other),
    }
}

impl RunStore for PgRunStore {
    fn load_run(&self, run_id: i64) -> BoxFuture<'_, Result<RunRecord, StoreError>> {
        async move {
            let row = aivis_db::get_run(&self.pool, run_id).await.map_err(map_db)?;
            Ok(RunRecord {
                id: row.id,
                public_id: row.public_id,
                brand_id: row.brand_id,
                domain: row.domain,
                requester_email: row.requester_email,
                state: RunState::parse(&row.status),
                degraded: row.degraded,
            })
        }
        .boxed()
    }

    fn transition(
        &self,
        run_id: i64,
        from: RunState,
        to: RunState,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            aivis_db::transition_run(&self.pool, run_id, from.as_str(), to.as_str())
                .await
                .map_err(map_db)
        }
        .boxed()
    }

    fn save_checkpoint(
        &self,
        run_id: i64,
        step: RunStep,
        payload: Value,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            aivis_db::save_checkpoint(&self.pool, run_id, step.as_str(), &payload)
                .await
                .map_err(map_db)
        }
        .boxed()
    }

    fn load_checkpoint(
        &self,
        run_id: i64,
        step: RunStep,
    ) -> BoxFuture<'_, Result<Option<Value>, StoreError>> {
        async move {
            aivis_db::load_checkpoint(&self.pool, run_id, step.as_str())
                .await
                .map_err(map_db)
        }
        .boxed()
    }

    fn persist_summaries(
        &self,
        run_id: i64,
        summaries: Vec<PromptResultSummary>,
    ) -> BoxFuture<'_, Result<u64, StoreError>> {
        async move {
            aivis_db::upsert_prompt_results(&self.pool, run_id, &summaries)
                .await
                .map_err(map_db)
        }
        .boxed()
    }

    fn mark_failed(
        &self,
        run_id: i64,
        step: RunStep,
        error_message: String,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            aivis_db::mark_run_failed(&self.pool, run_id, step.as_str(), &error_message)
                .await
                .map_err(map_db)
        }
        .boxed()
    }

    fn mark_degraded(&self, run_id: i64) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            aivis_db::mark_run_degraded(&self.pool, run_id)
                .await
                .map_err(map_db)
        }
        .boxed()
    }

    fn cancel_requested(&self, run_id: i64) -> BoxFuture<'_, Result<bool, StoreError>> {
        async move {
            aivis_db::run_cancel_requested(&self.pool, run_id)
                .await
                .map_err(map_db)
        }
        .boxed()
    }
}
