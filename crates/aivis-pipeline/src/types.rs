//! Pipeline-internal types: run states, steps, and fan-out outcomes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aivis_core::PromptResultSummary;

/// Lifecycle of one analysis run.
///
/// `queued → analyzing → persisting → notifying → completed`, with `failed`
/// reachable from any non-terminal state once a step's retry budget is
/// exhausted, and `cancelled` reachable between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Queued,
    Analyzing,
    Persisting,
    Notifying,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Queued => "queued",
            RunState::Analyzing => "analyzing",
            RunState::Persisting => "persisting",
            RunState::Notifying => "notifying",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status string. Unknown strings map to `Failed` so a
    /// corrupted row can never be mistaken for live work.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => RunState::Queued,
            "analyzing" => RunState::Analyzing,
            "persisting" => RunState::Persisting,
            "notifying" => RunState::Notifying,
            "completed" => RunState::Completed,
            "cancelled" => RunState::Cancelled,
            _ => RunState::Failed,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The independently retryable steps of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStep {
    Analyze,
    Persist,
    Notify,
}

impl RunStep {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStep::Analyze => "analyze",
            RunStep::Persist => "persist",
            RunStep::Notify => "notify",
        }
    }
}

impl std::fmt::Display for RunStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The orchestrator's view of one run row.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub public_id: Uuid,
    pub brand_id: i64,
    pub domain: String,
    pub requester_email: String,
    pub state: RunState,
    pub degraded: bool,
}

/// What the mention matcher needs to know about a brand.
#[derive(Debug, Clone)]
pub struct BrandFacts {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub aliases: Vec<String>,
}

/// One active prompt entering the fan-out.
#[derive(Debug, Clone)]
pub struct PromptFacts {
    pub id: i64,
    pub text: String,
}

/// Result of one (prompt, engine) pair, successful or not. Serialized into
/// the analyze-step checkpoint so a resumed run can skip the fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairOutcome {
    pub prompt_id: i64,
    pub engine: String,
    pub result: PairResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PairResult {
    Succeeded { summary: PromptResultSummary },
    /// Retries exhausted; the pair is a recorded gap, not a run failure.
    Failed { error: String },
}

impl PairOutcome {
    #[must_use]
    pub fn summary(&self) -> Option<&PromptResultSummary> {
        match &self.result {
            PairResult::Succeeded { summary } => Some(summary),
            PairResult::Failed { .. } => None,
        }
    }
}

/// What `Orchestrator::execute` reports back to its caller.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: i64,
    pub state: RunState,
    pub degraded: bool,
    /// Summaries newly written by this execution's Persisting step.
    pub persisted: u64,
    pub failed_pairs: usize,
}
