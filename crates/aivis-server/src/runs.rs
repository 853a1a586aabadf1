//! Bridges the HTTP layer to the run orchestrator.
//!
//! Handlers and the scheduler hand a run row to [`RunLauncher::spawn`]; the
//! launcher assembles the run context (brand facts plus active prompts) and
//! drives the orchestrator on a background task, so intake stays a 202.

use std::sync::Arc;

use sqlx::PgPool;

use aivis_db::{AnalysisRunRow, DbError};
use aivis_pipeline::{BrandFacts, Orchestrator, PromptFacts, RunContext};

pub struct RunLauncher {
    pool: PgPool,
    orchestrator: Arc<Orchestrator>,
}

impl RunLauncher {
    #[must_use]
    pub fn new(pool: PgPool, orchestrator: Arc<Orchestrator>) -> Self {
        Self { pool, orchestrator }
    }

    /// Drives one run on a detached task. Failures are logged, never
    /// propagated; the run row carries the durable outcome.
    pub fn spawn(self: &Arc<Self>, run: AnalysisRunRow) {
        let launcher = Arc::clone(self);
        tokio::spawn(async move {
            launcher.drive(run).await;
        });
    }

    /// Picks up every non-terminal run, e.g. after a restart.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the resumable listing cannot be loaded.
    pub async fn resume_interrupted(self: &Arc<Self>) -> Result<usize, DbError> {
        let runs = aivis_db::list_resumable_runs(&self.pool).await?;
        let count = runs.len();
        for run in runs {
            tracing::info!(run_id = run.id, status = %run.status, "resuming interrupted run");
            self.spawn(run);
        }
        Ok(count)
    }

    async fn drive(&self, run: AnalysisRunRow) {
        let run_id = run.id;
        let ctx = match self.context_for(&run).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!(run_id, error = %e, "could not assemble run context");
                return;
            }
        };

        match self.orchestrator.execute(&ctx).await {
            Ok(outcome) => {
                tracing::info!(
                    run_id,
                    state = %outcome.state,
                    degraded = outcome.degraded,
                    persisted = outcome.persisted,
                    failed_pairs = outcome.failed_pairs,
                    "run finished"
                );
            }
            Err(e) => {
                tracing::error!(run_id, error = %e, "run aborted on infrastructure error");
            }
        }
    }

    async fn context_for(&self, run: &AnalysisRunRow) -> Result<RunContext, DbError> {
        let brand = aivis_db::get_brand(&self.pool, run.brand_id).await?;
        let prompts = aivis_db::list_active_prompts(&self.pool, brand.id).await?;

        Ok(RunContext {
            run_id: run.id,
            brand: BrandFacts {
                id: brand.id,
                name: brand.name,
                domain: brand.domain,
                aliases: brand.aliases,
            },
            prompts: prompts
                .into_iter()
                .map(|p| PromptFacts {
                    id: p.id,
                    text: p.text,
                })
                .collect(),
        })
    }
}
