//! Durable analysis run orchestrator.
//!
//! [`Orchestrator::execute`] branches on the persisted run state, so one
//! entry point serves fresh runs and runs resumed after a crash. Each step
//! leaves a checkpoint before advancing, transitions are compare-and-swap,
//! and cancellation is honored at every step boundary.
//!
//! Step semantics:
//! - **analyzing** fans out one engine call per (prompt, engine) pair with
//!   bounded concurrency; a pair that exhausts its retries becomes a recorded
//!   gap, not a run failure. The full outcome set is checkpointed before the
//!   state advances, so a restart never re-queries engines.
//! - **persisting** writes succeeded summaries insert-once; transient store
//!   errors are retried, exhaustion fails the run at this step.
//! - **notifying** sends the run summary; exhaustion completes the run
//!   flagged degraded instead of failing it.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use aivis_core::{EngineQuery, Notifier, PromptResultSummary, RunSummary};

use crate::aggregate::run_visibility;
use crate::analyzer::analyze_pair;
use crate::error::PipelineError;
use crate::mention::MentionMatcher;
use crate::retry::retry_with_backoff;
use crate::store::{RunStore, StoreError};
use crate::types::{
    BrandFacts, PairOutcome, PairResult, PromptFacts, RunOutcome, RunRecord, RunState, RunStep,
};

/// Tuning for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Engine ids to fan out over, from the engine catalog.
    pub engines: Vec<String>,
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_app_config(config: &aivis_core::AppConfig, engines: Vec<String>) -> Self {
        Self {
            engines,
            max_concurrency: config.analysis_max_concurrency,
            max_retries: config.analysis_max_retries,
            backoff_base_ms: config.analysis_backoff_base_ms,
        }
    }
}

/// Everything `execute` needs beyond the run row itself.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: i64,
    pub brand: BrandFacts,
    pub prompts: Vec<PromptFacts>,
}

pub struct Orchestrator {
    store: Arc<dyn RunStore>,
    engine_client: Arc<dyn EngineQuery>,
    notifier: Arc<dyn Notifier>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn RunStore>,
        engine_client: Arc<dyn EngineQuery>,
        notifier: Arc<dyn Notifier>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            engine_client,
            notifier,
            config,
        }
    }

    /// Drives a run from its current persisted state to a terminal one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only for infrastructure faults: the run row
    /// is gone, a checkpoint cannot be (de)serialized, or another worker won
    /// a transition race. Step-level failures land in the returned
    /// [`RunOutcome`] as `Failed` state instead.
    pub async fn execute(&self, ctx: &RunContext) -> Result<RunOutcome, PipelineError> {
        let run_id = ctx.run_id;
        let mut persisted = 0u64;

        loop {
            let record = self
                .store
                .load_run(run_id)
                .await
                .map_err(|source| PipelineError::Store {
                    step: RunStep::Analyze,
                    source,
                })?;

            if record.state.is_terminal() {
                let failed_pairs = self.checkpoint_failed_pairs(run_id).await;
                return Ok(RunOutcome {
                    run_id,
                    state: record.state,
                    degraded: record.degraded,
                    persisted,
                    failed_pairs,
                });
            }

            if self.cancel_if_requested(run_id, record.state).await? {
                continue;
            }

            match record.state {
                RunState::Queued => {
                    self.transition(run_id, RunState::Queued, RunState::Analyzing, RunStep::Analyze)
                        .await?;
                }
                RunState::Analyzing => {
                    self.run_analyze_step(ctx).await?;
                    self.transition(
                        run_id,
                        RunState::Analyzing,
                        RunState::Persisting,
                        RunStep::Analyze,
                    )
                    .await?;
                }
                RunState::Persisting => {
                    match self.run_persist_step(run_id).await? {
                        Some(inserted) => {
                            persisted = inserted;
                            self.transition(
                                run_id,
                                RunState::Persisting,
                                RunState::Notifying,
                                RunStep::Persist,
                            )
                            .await?;
                        }
                        // Step failed terminally; the loop observes `failed`.
                        None => {}
                    }
                }
                RunState::Notifying => {
                    self.run_notify_step(&record, ctx).await?;
                    self.transition(
                        run_id,
                        RunState::Notifying,
                        RunState::Completed,
                        RunStep::Notify,
                    )
                    .await?;
                }
                RunState::Completed | RunState::Failed | RunState::Cancelled => unreachable!(),
            }
        }
    }

    /// Fans out engine calls and checkpoints the outcome set. Skipped
    /// entirely when a prior attempt already left a checkpoint.
    async fn run_analyze_step(&self, ctx: &RunContext) -> Result<(), PipelineError> {
        if self
            .load_outcomes(ctx.run_id)
            .await
            .map_err(|source| PipelineError::Store {
                step: RunStep::Analyze,
                source,
            })?
            .is_some()
        {
            tracing::info!(run_id = ctx.run_id, "analyze checkpoint found, skipping fan-out");
            return Ok(());
        }

        let matcher = MentionMatcher::for_brand(&ctx.brand);
        let pairs: Vec<(PromptFacts, String)> = ctx
            .prompts
            .iter()
            .flat_map(|prompt| {
                self.config
                    .engines
                    .iter()
                    .map(move |engine| (prompt.clone(), engine.clone()))
            })
            .collect();

        tracing::info!(
            run_id = ctx.run_id,
            brand = %ctx.brand.domain,
            pairs = pairs.len(),
            concurrency = self.config.max_concurrency,
            "fanning out analysis"
        );

        let mut outcomes: Vec<PairOutcome> = stream::iter(pairs)
            .map(|(prompt, engine)| {
                let matcher = &matcher;
                let client = Arc::clone(&self.engine_client);
                let max_retries = self.config.max_retries;
                let backoff = self.config.backoff_base_ms;
                async move {
                    let result = retry_with_backoff(
                        max_retries,
                        backoff,
                        aivis_core::ExternalError::is_retriable,
                        || analyze_pair(client.as_ref(), matcher, &prompt, &engine),
                    )
                    .await;

                    match result {
                        Ok(summary) => PairOutcome {
                            prompt_id: prompt.id,
                            engine,
                            result: PairResult::Succeeded { summary },
                        },
                        Err(err) => {
                            tracing::warn!(
                                prompt_id = prompt.id,
                                engine = %engine,
                                error = %err,
                                "pair exhausted its retries"
                            );
                            PairOutcome {
                                prompt_id: prompt.id,
                                engine,
                                result: PairResult::Failed {
                                    error: err.to_string(),
                                },
                            }
                        }
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        // Deterministic checkpoint regardless of completion order.
        outcomes.sort_by(|a, b| (a.prompt_id, &a.engine).cmp(&(b.prompt_id, &b.engine)));

        let payload = serde_json::to_value(&outcomes)?;
        self.store
            .save_checkpoint(ctx.run_id, RunStep::Analyze, payload)
            .await
            .map_err(|source| PipelineError::Store {
                step: RunStep::Analyze,
                source,
            })?;

        Ok(())
    }

    /// Writes succeeded summaries. Returns `Some(inserted)` on success and
    /// `None` when the step exhausted its retries and failed the run.
    async fn run_persist_step(&self, run_id: i64) -> Result<Option<u64>, PipelineError> {
        let outcomes = self.require_outcomes(run_id, RunStep::Persist).await?;
        let summaries: Vec<PromptResultSummary> = outcomes
            .iter()
            .filter_map(|o| o.summary().cloned())
            .collect();

        let result = retry_with_backoff(
            self.config.max_retries,
            self.config.backoff_base_ms,
            StoreError::is_retriable,
            || self.store.persist_summaries(run_id, summaries.clone()),
        )
        .await;

        match result {
            Ok(inserted) => {
                tracing::info!(run_id, inserted, total = summaries.len(), "results persisted");
                Ok(Some(inserted))
            }
            Err(err) => {
                tracing::error!(run_id, error = %err, "persist step exhausted its retries");
                self.store
                    .mark_failed(run_id, RunStep::Persist, err.to_string())
                    .await
                    .map_err(|source| PipelineError::Store {
                        step: RunStep::Persist,
                        source,
                    })?;
                Ok(None)
            }
        }
    }

    /// Notifies the requester. Exhaustion flags the run degraded; the run
    /// still completes.
    async fn run_notify_step(
        &self,
        record: &RunRecord,
        ctx: &RunContext,
    ) -> Result<(), PipelineError> {
        let outcomes = self.require_outcomes(ctx.run_id, RunStep::Notify).await?;
        let visibility = run_visibility(&outcomes);
        let summary = RunSummary {
            run_id: record.public_id,
            domain: record.domain.clone(),
            expected_pairs: visibility.expected_pairs,
            succeeded_pairs: visibility.succeeded_pairs,
            failed_pairs: visibility.failed_pairs,
            mentioned_pairs: visibility.mentioned_pairs,
            mean_score: visibility.mean_score,
        };

        let result = retry_with_backoff(
            self.config.max_retries,
            self.config.backoff_base_ms,
            aivis_core::ExternalError::is_retriable,
            || self.notifier.notify(&record.requester_email, &summary),
        )
        .await;

        if let Err(err) = result {
            tracing::warn!(
                run_id = ctx.run_id,
                error = %err,
                "notification exhausted its retries, completing degraded"
            );
            self.store
                .mark_degraded(ctx.run_id)
                .await
                .map_err(|source| PipelineError::Store {
                    step: RunStep::Notify,
                    source,
                })?;
        }

        Ok(())
    }

    async fn transition(
        &self,
        run_id: i64,
        from: RunState,
        to: RunState,
        step: RunStep,
    ) -> Result<(), PipelineError> {
        self.store
            .transition(run_id, from, to)
            .await
            .map_err(|source| PipelineError::Store { step, source })
    }

    /// Moves the run to `cancelled` if a cancel was requested. Returns
    /// whether the state changed.
    async fn cancel_if_requested(
        &self,
        run_id: i64,
        current: RunState,
    ) -> Result<bool, PipelineError> {
        let requested = self
            .store
            .cancel_requested(run_id)
            .await
            .map_err(|source| PipelineError::Store {
                step: RunStep::Analyze,
                source,
            })?;
        if !requested {
            return Ok(false);
        }

        tracing::info!(run_id, state = %current, "cancel requested, stopping at step boundary");
        self.transition(run_id, current, RunState::Cancelled, RunStep::Analyze)
            .await?;
        Ok(true)
    }

    async fn load_outcomes(&self, run_id: i64) -> Result<Option<Vec<PairOutcome>>, StoreError> {
        let payload: Option<Value> = self.store.load_checkpoint(run_id, RunStep::Analyze).await?;
        match payload {
            Some(value) => {
                let outcomes: Vec<PairOutcome> = serde_json::from_value(value)
                    .map_err(|e| StoreError::Unavailable(format!("corrupt checkpoint: {e}")))?;
                Ok(Some(outcomes))
            }
            None => Ok(None),
        }
    }

    async fn require_outcomes(
        &self,
        run_id: i64,
        step: RunStep,
    ) -> Result<Vec<PairOutcome>, PipelineError> {
        self.load_outcomes(run_id)
            .await
            .map_err(|source| PipelineError::Store { step, source })?
            .ok_or_else(|| PipelineError::Permanent {
                step,
                reason: "analyze checkpoint missing".to_string(),
            })
    }

    async fn checkpoint_failed_pairs(&self, run_id: i64) -> usize {
        match self.load_outcomes(run_id).await {
            Ok(Some(outcomes)) => outcomes
                .iter()
                .filter(|o| matches!(o.result, PairResult::Failed { .. }))
                .count(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use uuid::Uuid;

    use aivis_core::ExternalError;

    use crate::store::memory::MemoryRunStore;

    use super::*;

    struct ScriptedEngine {
        calls: AtomicU32,
        /// (engine, prompt) pairs that always time out.
        failing: Mutex<HashSet<(String, String)>>,
    }

    impl ScriptedEngine {
        fn healthy() -> Self {
            Self {
                calls: AtomicU32::new(0),
                failing: Mutex::new(HashSet::new()),
            }
        }

        fn fail_pair(&self, engine: &str, prompt: &str) {
            self.failing
                .lock()
                .unwrap()
                .insert((engine.to_string(), prompt.to_string()));
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EngineQuery for ScriptedEngine {
        fn query<'a>(
            &'a self,
            engine: &'a str,
            prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, ExternalError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let failing = self
                    .failing
                    .lock()
                    .unwrap()
                    .contains(&(engine.to_string(), prompt.to_string()));
                if failing {
                    Err(ExternalError::Timeout {
                        what: format!("engine {engine}"),
                    })
                } else {
                    Ok(format!("Acme is an excellent option, says {engine}."))
                }
            }
            .boxed()
        }
    }

    struct ScriptedNotifier {
        calls: AtomicU32,
        failures_left: AtomicU32,
        last: Mutex<Option<(String, RunSummary)>>,
    }

    impl ScriptedNotifier {
        fn healthy() -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_left: AtomicU32::new(0),
                last: Mutex::new(None),
            }
        }

        fn always_failing() -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_left: AtomicU32::new(u32::MAX),
                last: Mutex::new(None),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_summary(&self) -> Option<(String, RunSummary)> {
            self.last.lock().unwrap().clone()
        }
    }

    impl Notifier for ScriptedNotifier {
        fn notify<'a>(
            &'a self,
            email: &'a str,
            summary: &'a RunSummary,
        ) -> BoxFuture<'a, Result<(), ExternalError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let failing = self
                    .failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if failing {
                    Err(ExternalError::Unavailable {
                        what: "webhook".to_string(),
                        reason: "503".to_string(),
                    })
                } else {
                    *self.last.lock().unwrap() = Some((email.to_string(), summary.clone()));
                    Ok(())
                }
            }
            .boxed()
        }
    }

    fn run_record(id: i64, state: RunState) -> RunRecord {
        RunRecord {
            id,
            public_id: Uuid::new_v4(),
            brand_id: 1,
            domain: "acme.io".to_string(),
            requester_email: "dev@acme.io".to_string(),
            state,
            degraded: false,
        }
    }

    fn context(run_id: i64) -> RunContext {
        RunContext {
            run_id,
            brand: BrandFacts {
                id: 1,
                name: "Acme".to_string(),
                domain: "acme.io".to_string(),
                aliases: vec![],
            },
            prompts: vec![
                PromptFacts {
                    id: 10,
                    text: "best widget vendor?".to_string(),
                },
                PromptFacts {
                    id: 11,
                    text: "most reliable widget api?".to_string(),
                },
                PromptFacts {
                    id: 12,
                    text: "widget pricing leaders?".to_string(),
                },
            ],
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            engines: vec!["atlas".to_string(), "borealis".to_string()],
            max_concurrency: 4,
            max_retries: 2,
            backoff_base_ms: 0,
        }
    }

    struct Harness {
        store: Arc<MemoryRunStore>,
        engine: Arc<ScriptedEngine>,
        notifier: Arc<ScriptedNotifier>,
        orchestrator: Orchestrator,
    }

    fn harness(initial_state: RunState, notifier: ScriptedNotifier) -> Harness {
        let store = Arc::new(MemoryRunStore::new());
        store.insert_run(run_record(1, initial_state));
        let engine = Arc::new(ScriptedEngine::healthy());
        let notifier = Arc::new(notifier);
        let orchestrator = Orchestrator::new(
            Arc::clone(&store) as Arc<dyn RunStore>,
            Arc::clone(&engine) as Arc<dyn EngineQuery>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            config(),
        );
        Harness {
            store,
            engine,
            notifier,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn full_run_completes_and_persists_every_pair() {
        let h = harness(RunState::Queued, ScriptedNotifier::healthy());

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Completed);
        assert!(!outcome.degraded);
        assert_eq!(outcome.persisted, 6, "3 prompts x 2 engines");
        assert_eq!(outcome.failed_pairs, 0);
        assert_eq!(h.engine.calls(), 6);

        let results = h.store.stored_results(1);
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.mentioned));

        let (email, summary) = h.notifier.last_summary().expect("notified");
        assert_eq!(email, "dev@acme.io");
        assert_eq!(summary.expected_pairs, 6);
        assert_eq!(summary.succeeded_pairs, 6);
        assert!(summary.mean_score.is_some());
    }

    #[tokio::test]
    async fn engine_outages_degrade_to_recorded_gaps_not_run_failure() {
        let h = harness(RunState::Queued, ScriptedNotifier::healthy());
        h.engine.fail_pair("atlas", "best widget vendor?");
        h.engine.fail_pair("borealis", "widget pricing leaders?");

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Completed);
        assert_eq!(outcome.failed_pairs, 2);
        assert_eq!(outcome.persisted, 4);

        let (_, summary) = h.notifier.last_summary().expect("notified");
        assert_eq!(summary.expected_pairs, 6);
        assert_eq!(summary.succeeded_pairs, 4);
        assert_eq!(summary.failed_pairs, 2);
    }

    #[tokio::test]
    async fn failing_pairs_are_retried_before_giving_up() {
        let h = harness(RunState::Queued, ScriptedNotifier::healthy());
        h.engine.fail_pair("atlas", "best widget vendor?");

        h.orchestrator.execute(&context(1)).await.expect("execute");

        // 5 healthy pairs once each, the failing pair 1 + 2 retries.
        assert_eq!(h.engine.calls(), 8);
    }

    #[tokio::test]
    async fn resume_from_persisting_skips_the_engines() {
        let h = harness(RunState::Persisting, ScriptedNotifier::healthy());
        let outcomes = vec![PairOutcome {
            prompt_id: 10,
            engine: "atlas".to_string(),
            result: PairResult::Succeeded {
                summary: PromptResultSummary {
                    prompt_id: 10,
                    engine: "atlas".to_string(),
                    mentioned: true,
                    sentiment: aivis_core::Sentiment::Positive,
                    compound: 0.5,
                    score: 75.0,
                },
            },
        }];
        h.store
            .save_checkpoint(1, RunStep::Analyze, serde_json::to_value(&outcomes).unwrap())
            .await
            .unwrap();

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Completed);
        assert_eq!(outcome.persisted, 1);
        assert_eq!(h.engine.calls(), 0, "resume must not re-query engines");
        assert_eq!(h.notifier.calls(), 1);
    }

    #[tokio::test]
    async fn notify_reuses_the_loaded_run_row() {
        let h = harness(RunState::Notifying, ScriptedNotifier::healthy());
        h.store
            .save_checkpoint(1, RunStep::Analyze, serde_json::json!([]))
            .await
            .unwrap();

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Completed);
        assert_eq!(h.notifier.calls(), 1);
        // One load per loop iteration: the notifying pass and the terminal
        // observation. The notify step itself must not issue another.
        assert_eq!(h.store.load_calls(), 2);
    }

    #[tokio::test]
    async fn notify_exhaustion_completes_the_run_degraded() {
        let h = harness(RunState::Queued, ScriptedNotifier::always_failing());

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Completed);
        assert!(outcome.degraded);
        assert_eq!(outcome.persisted, 6);
        assert_eq!(h.notifier.calls(), 3, "1 try + 2 retries");
    }

    #[tokio::test]
    async fn transient_persist_outage_is_retried_through() {
        let h = harness(RunState::Queued, ScriptedNotifier::healthy());
        h.store.fail_next_persists(1);

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Completed);
        assert_eq!(outcome.persisted, 6);
        assert_eq!(h.store.persist_calls(), 2);
    }

    #[tokio::test]
    async fn persist_exhaustion_fails_the_run_at_that_step() {
        let h = harness(RunState::Queued, ScriptedNotifier::healthy());
        h.store.fail_next_persists(u32::MAX);

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Failed);
        let (step, message) = h.store.failure(1).expect("failure recorded");
        assert_eq!(step, RunStep::Persist);
        assert!(message.contains("unavailable"));
        assert_eq!(h.notifier.calls(), 0, "a failed run never notifies");
    }

    #[tokio::test]
    async fn cancellation_stops_the_run_before_any_engine_call() {
        let h = harness(RunState::Queued, ScriptedNotifier::healthy());
        h.store.set_cancel_requested(1);

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Cancelled);
        assert_eq!(h.engine.calls(), 0);
        assert_eq!(h.store.persist_calls(), 0);
        assert_eq!(h.notifier.calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_between_steps_discards_pending_work() {
        let h = harness(RunState::Persisting, ScriptedNotifier::healthy());
        h.store
            .save_checkpoint(1, RunStep::Analyze, serde_json::json!([]))
            .await
            .unwrap();
        h.store.set_cancel_requested(1);

        let outcome = h.orchestrator.execute(&context(1)).await.expect("execute");

        assert_eq!(outcome.state, RunState::Cancelled);
        assert_eq!(h.store.persist_calls(), 0);
        assert!(h.store.stored_results(1).is_empty());
    }

    #[tokio::test]
    async fn replayed_persist_inserts_nothing_new() {
        let h = harness(RunState::Queued, ScriptedNotifier::healthy());
        let outcome = h.orchestrator.execute(&context(1)).await.expect("first");
        assert_eq!(outcome.persisted, 6);

        // A worker that died after persisting would replay the same write.
        let replay = h
            .store
            .persist_summaries(1, h.store.stored_results(1))
            .await
            .expect("replay");
        assert_eq!(replay, 0, "insert-once semantics");
    }
}
