mod api;
mod middleware;
mod runs;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use aivis_core::{ContentExtractor, EngineQuery, Notifier};
use aivis_engines::{AnswerGateway, LogNotifier, PageExtractor, WebhookNotifier};
use aivis_pipeline::{Orchestrator, OrchestratorConfig, PgRunStore, RunStore};

use crate::api::{build_app, AppState};
use crate::runs::RunLauncher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(aivis_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = aivis_db::PoolConfig::from_app_config(&config);
    let pool = aivis_db::connect_pool(&config.database_url, pool_config).await?;
    aivis_db::run_migrations(&pool).await?;

    let catalog = aivis_core::load_engine_catalog(&config.engines_path)?;
    tracing::info!(engines = ?catalog.ids(), "engine catalog loaded");

    let gateway: Arc<dyn EngineQuery> = Arc::new(AnswerGateway::from_catalog(
        &catalog,
        config.engine_request_timeout_secs,
    )?);
    let extractor: Arc<dyn ContentExtractor> = Arc::new(PageExtractor::new(
        config.extract_request_timeout_secs,
        &config.extract_user_agent,
    )?);
    let notifier: Arc<dyn Notifier> = match &config.notification_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url)?),
        None => {
            tracing::warn!("no notification webhook configured; run summaries go to the log");
            Arc::new(LogNotifier)
        }
    };

    let store: Arc<dyn RunStore> = Arc::new(PgRunStore::new(pool.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        store,
        gateway,
        notifier,
        OrchestratorConfig::from_app_config(&config, catalog.ids()),
    ));
    let launcher = Arc::new(RunLauncher::new(pool.clone(), orchestrator));

    let _scheduler = scheduler::build_scheduler(pool.clone(), Arc::clone(&launcher)).await?;

    let app = build_app(AppState {
        pool,
        launcher,
        extractor,
        trend_window: config.trend_window,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "aivis server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
