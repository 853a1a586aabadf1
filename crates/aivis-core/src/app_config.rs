use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Path to the YAML answer-engine catalog.
    pub engines_path: PathBuf,
    /// Webhook endpoint for run notifications. `None` disables delivery.
    pub notification_webhook_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Per-call timeout for answer-engine queries.
    pub engine_request_timeout_secs: u64,
    /// Per-call timeout for content extraction fetches.
    pub extract_request_timeout_secs: u64,
    pub extract_user_agent: String,
    /// Concurrent (prompt, engine) pairs in one run's fan-out.
    pub analysis_max_concurrency: usize,
    /// Additional attempts per retryable step or pair.
    pub analysis_max_retries: u32,
    pub analysis_backoff_base_ms: u64,
    /// Number of completed-run periods a trend delta looks back over.
    pub trend_window: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("engines_path", &self.engines_path)
            .field("database_url", &"[redacted]")
            .field(
                "notification_webhook_url",
                &self.notification_webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "engine_request_timeout_secs",
                &self.engine_request_timeout_secs,
            )
            .field(
                "extract_request_timeout_secs",
                &self.extract_request_timeout_secs,
            )
            .field("extract_user_agent", &self.extract_user_agent)
            .field("analysis_max_concurrency", &self.analysis_max_concurrency)
            .field("analysis_max_retries", &self.analysis_max_retries)
            .field("analysis_backoff_base_ms", &self.analysis_backoff_base_ms)
            .field("trend_window", &self.trend_window)
            .finish()
    }
}
