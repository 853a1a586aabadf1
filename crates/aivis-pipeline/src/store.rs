//! Storage seam for the analysis orchestrator.
//!
//! The orchestrator drives runs through [`RunStore`] rather than holding a
//! pool directly. [`pg::PgRunStore`] is the production implementation on top
//! of `aivis-db`; [`memory::MemoryRunStore`] backs the orchestrator tests
//! with failure injection.

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use aivis_core::PromptResultSummary;

use crate::types::{RunRecord, RunState, RunStep};

pub mod memory;
pub mod pg;

/// Why a store call failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run not found")]
    NotFound,

    #[error("run {id} is not in status '{expected_state}'")]
    InvalidTransition { id: i64, expected_state: String },

    /// Transient outage injected by test doubles or surfaced by the driver.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Db(#[from] aivis_db::DbError),
}

impl StoreError {
    /// Transient failures are worth retrying; conflicts and misses are not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Db(aivis_db::DbError::Sqlx(_) | aivis_db::DbError::Migration(_)) => true,
            Self::Db(_) | Self::NotFound | Self::InvalidTransition { .. } => false,
        }
    }
}

/// Durable run state as the orchestrator sees it.
pub trait RunStore: Send + Sync {
    fn load_run(&self, run_id: i64) -> BoxFuture<'_, Result<RunRecord, StoreError>>;

    /// Compare-and-swap state transition. Fails with
    /// [`StoreError::InvalidTransition`] when the run is not in `from`.
    fn transition(
        &self,
        run_id: i64,
        from: RunState,
        to: RunState,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    fn save_checkpoint(
        &self,
        run_id: i64,
        step: RunStep,
        payload: Value,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    fn load_checkpoint(
        &self,
        run_id: i64,
        step: RunStep,
    ) -> BoxFuture<'_, Result<Option<Value>, StoreError>>;

    /// Write per-pair results, skipping rows already present. Returns the
    /// number of newly inserted rows.
    fn persist_summaries(
        &self,
        run_id: i64,
        summaries: Vec<PromptResultSummary>,
    ) -> BoxFuture<'_, Result<u64, StoreError>>;

    fn mark_failed(
        &self,
        run_id: i64,
        step: RunStep,
        error_message: String,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    fn mark_degraded(&self, run_id: i64) -> BoxFuture<'_, Result<(), StoreError>>;

    fn cancel_requested(&self, run_id: i64) -> BoxFuture<'_, Result<bool, StoreError>>;
}
