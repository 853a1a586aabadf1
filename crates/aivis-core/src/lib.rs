//! Shared domain types, configuration, and collaborator contracts for aivis.
//!
//! Everything here is plumbing-free: no HTTP, no database. The pipeline and
//! surface crates build on these types so that tests can substitute fakes for
//! every external collaborator.

use thiserror::Error;

pub mod app_config;
pub mod collab;
pub mod config;
pub mod engines;
pub mod types;
pub mod validation;

pub use app_config::{AppConfig, Environment};
pub use collab::{ContentExtractor, EngineQuery, ExternalError, Notifier};
pub use config::{load_app_config, load_app_config_from_env};
pub use engines::{load_engine_catalog, EngineCatalog, EngineSpec};
pub use types::{
    AnalysisRequest, Industry, PromptResultSummary, RunSummary, Sentiment,
};
pub use validation::{validate_submission, validate_url, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read engine catalog at {path}: {source}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse engine catalog: {0}")]
    CatalogParse(#[from] serde_yaml::Error),

    #[error("engine catalog validation failed: {0}")]
    Validation(String),
}
