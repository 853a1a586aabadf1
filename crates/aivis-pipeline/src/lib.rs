//! The aivis analysis pipeline.
//!
//! Turns one accepted domain submission into durable, comparable visibility
//! observations: a mention analyzer per (prompt, engine) pair, a checkpointed
//! run orchestrator with per-step retries, and the aggregation that folds
//! per-pair results into brand-level and competitor-relative signals.

pub mod aggregate;
pub mod analyzer;
pub mod error;
pub mod mention;
pub mod orchestrator;
pub mod retry;
pub mod store;
pub mod types;

pub use aggregate::{
    compare, run_visibility, trend, ComparisonResult, EntityHistory, EntityStanding, RunVisibility,
    ScorePoint,
};
pub use analyzer::{analyze_pair, summarize_answer};
pub use error::PipelineError;
pub use mention::{MentionContext, MentionMatcher};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunContext};
pub use store::{memory::MemoryRunStore, pg::PgRunStore, RunStore, StoreError};
pub use types::{BrandFacts, PairOutcome, PairResult, PromptFacts, RunOutcome, RunRecord, RunState, RunStep};
