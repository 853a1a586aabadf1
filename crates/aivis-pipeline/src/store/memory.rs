//! In-memory [`RunStore`] used by orchestrator tests.
//!
//! Mirrors the Postgres semantics that matter to the orchestrator: CAS
//! transitions, checkpoint replacement, and insert-once result persistence.
//! Transient outages are injected with [`MemoryRunStore::fail_next_persists`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use aivis_core::PromptResultSummary;

use crate::store::{RunStore, StoreError};
use crate::types::{RunRecord, RunState, RunStep};

#[derive(Default)]
struct Inner {
    runs: HashMap<i64, RunRecord>,
    failed: HashMap<i64, (RunStep, String)>,
    cancel_flags: HashMap<i64, bool>,
    checkpoints: HashMap<(i64, RunStep), Value>,
    results: HashMap<(i64, i64, String), PromptResultSummary>,
}

#[derive(Default)]
pub struct MemoryRunStore {
    inner: Mutex<Inner>,
    failing_persists: AtomicU32,
    persist_calls: AtomicU32,
    load_calls: AtomicU32,
}

impl MemoryRunStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_run(&self, record: RunRecord) {
        let mut inner = self.lock();
        inner.cancel_flags.insert(record.id, false);
        inner.runs.insert(record.id, record);
    }

    /// The next `n` persist calls fail with [`StoreError::Unavailable`].
    pub fn fail_next_persists(&self, n: u32) {
        self.failing_persists.store(n, Ordering::SeqCst);
    }

    #[must_use]
    pub fn persist_calls(&self) -> u32 {
        self.persist_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn set_cancel_requested(&self, run_id: i64) {
        self.lock()
            .cancel_flags
            .insert(run_id, true);
    }

    #[must_use]
    pub fn run_state(&self, run_id: i64) -> Option<RunState> {
        self.lock().runs.get(&run_id).map(|r| r.state)
    }

    #[must_use]
    pub fn failure(&self, run_id: i64) -> Option<(RunStep, String)> {
        self.lock().failed.get(&run_id).cloned()
    }

    #[must_use]
    pub fn stored_results(&self, run_id: i64) -> Vec<PromptResultSummary> {
        let inner = self.lock();
        let mut rows: Vec<_> = inner
            .results
            .iter()
            .filter(|((rid, _, _), _)| *rid == run_id)
            .map(|(_, summary)| summary.clone())
            .collect();
        rows.sort_by(|a, b| (a.prompt_id, &a.engine).cmp(&(b.prompt_id, &b.engine)));
        rows
    }

    #[must_use]
    pub fn checkpoint(&self, run_id: i64, step: RunStep) -> Option<Value> {
        self.lock()
            .checkpoints
            .get(&(run_id, step))
            .cloned()
    }
}

impl RunStore for MemoryRunStore {
    fn load_run(&self, run_id: i64) -> BoxFuture<'_, Result<RunRecord, StoreError>> {
        async move {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            self.lock()
                .runs
                .get(&run_id)
                .cloned()
                .ok_or(StoreError::NotFound)
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
            let mut inner = self.lock();
            let run = inner.runs.get_mut(&run_id).ok_or(StoreError::NotFound)?;
            if run.state != from {
                return Err(StoreError::InvalidTransition {
                    id: run_id,
                    expected_state: from.as_str().to_string(),
                });
            }
            run.state = to;
            Ok(())
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
            self.lock()
                .checkpoints
                .insert((run_id, step), payload);
            Ok(())
        }
        .boxed()
    }

    fn load_checkpoint(
        &self,
        run_id: i64,
        step: RunStep,
    ) -> BoxFuture<'_, Result<Option<Value>, StoreError>> {
        async move {
            Ok(self
                .lock()
                .checkpoints
                .get(&(run_id, step))
                .cloned())
        }
        .boxed()
    }

    fn persist_summaries(
        &self,
        run_id: i64,
        summaries: Vec<PromptResultSummary>,
    ) -> BoxFuture<'_, Result<u64, StoreError>> {
        async move {
            self.persist_calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failing_persists
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Unavailable("injected outage".to_string()));
            }

            let mut inner = self.lock();
            let mut inserted = 0u64;
            for summary in summaries {
                let key = (run_id, summary.prompt_id, summary.engine.clone());
                if let std::collections::hash_map::Entry::Vacant(slot) = inner.results.entry(key) {
                    slot.insert(summary);
                    inserted += 1;
                }
            }
            Ok(inserted)
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
            let mut inner = self.lock();
            let run = inner.runs.get_mut(&run_id).ok_or(StoreError::NotFound)?;
            run.state = RunState::Failed;
            inner.failed.insert(run_id, (step, error_message));
            Ok(())
        }
        .boxed()
    }

    fn mark_degraded(&self, run_id: i64) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let mut inner = self.lock();
            let run = inner.runs.get_mut(&run_id).ok_or(StoreError::NotFound)?;
            run.degraded = true;
            Ok(())
        }
        .boxed()
    }

    fn cancel_requested(&self, run_id: i64) -> BoxFuture<'_, Result<bool, StoreError>> {
        async move {
            self.lock()
                .cancel_flags
                .get(&run_id)
                .copied()
                .ok_or(StoreError::NotFound)
        }
        .boxed()
    }
}
