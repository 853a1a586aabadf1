use thiserror::Error;

use crate::store::StoreError;
use crate::types::RunStep;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run store refused or lost an operation that is not worth retrying.
    #[error("store error during {step} step: {source}")]
    Store {
        step: RunStep,
        #[source]
        source: StoreError,
    },

    /// A step exhausted its retry budget; the run has been marked failed.
    #[error("retry budget exhausted during {step} step: {reason}")]
    Permanent { step: RunStep, reason: String },

    /// A checkpoint payload did not deserialize back into pair outcomes.
    #[error("corrupt checkpoint payload: {0}")]
    Checkpoint(#[from] serde_json::Error),
}
