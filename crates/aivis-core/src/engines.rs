//! Answer-engine catalog: which third-party engines a run fans out to.
//!
//! The catalog is a YAML file so adding an engine is a config change, not a
//! code change. Every (active prompt × catalog engine) pair becomes one
//! analyzer invocation.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One configured answer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSpec {
    /// Stable identifier stored on every prompt result (e.g. `"atlas"`).
    pub id: String,
    /// HTTP endpoint of the engine gateway for this engine.
    pub endpoint: String,
    /// Per-call timeout override in seconds; falls back to the app default.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineCatalog {
    pub engines: Vec<EngineSpec>,
}

impl EngineCatalog {
    /// Engine identifiers in catalog order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.id.clone()).collect()
    }
}

/// Load and validate the engine catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_engine_catalog(path: &Path) -> Result<EngineCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: EngineCatalog = serde_yaml::from_str(&content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &EngineCatalog) -> Result<(), ConfigError> {
    if catalog.engines.is_empty() {
        return Err(ConfigError::Validation(
            "engine catalog must list at least one engine".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for engine in &catalog.engines {
        if engine.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "engine id must be non-empty".to_string(),
            ));
        }
        if !seen_ids.insert(engine.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate engine id: {}",
                engine.id
            )));
        }
        if !engine.endpoint.starts_with("http://") && !engine.endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "engine {} endpoint must be http(s): {}",
                engine.id, engine.endpoint
            )));
        }
    }

    Ok(())
}
