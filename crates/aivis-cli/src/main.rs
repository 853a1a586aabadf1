//! Operator command line: run analyses, score pages, and inspect history
//! without going through the HTTP surface.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use aivis_core::{validate_submission, validate_url, ContentExtractor, EngineQuery, Notifier};
use aivis_engines::{AnswerGateway, LogNotifier, PageExtractor, WebhookNotifier};
use aivis_pipeline::{
    compare, BrandFacts, EntityHistory, Orchestrator, OrchestratorConfig, PgRunStore, PromptFacts,
    RunContext, RunStore, ScorePoint,
};
use aivis_scoring::{score_content, ScoreWeights};

#[derive(Debug, Parser)]
#[command(name = "aivis-cli")]
#[command(about = "aivis brand visibility command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a full analysis for a domain and wait for it to finish.
    Analyze {
        #[arg(long)]
        domain: String,
        #[arg(long)]
        email: String,
    },
    /// Fetch a page, score its content, and record the result.
    Score {
        #[arg(long)]
        url: String,
    },
    /// Rank a brand against its linked competitors.
    Compare {
        #[arg(long)]
        slug: String,
    },
    /// List recent analysis runs.
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Add an active prompt to a brand.
    PromptAdd {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        text: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Deactivate a prompt so future runs skip it.
    PromptDisable {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        prompt_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = aivis_core::load_app_config()?;
    let pool = aivis_db::connect_pool(
        &config.database_url,
        aivis_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    aivis_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Analyze { domain, email } => analyze(&pool, &config, &domain, &email).await,
        Commands::Score { url } => score(&pool, &config, &url).await,
        Commands::Compare { slug } => run_compare(&pool, &config, &slug).await,
        Commands::Runs { limit } => list_runs(&pool, limit).await,
        Commands::PromptAdd { slug, text, tags } => prompt_add(&pool, &slug, &text, &tags).await,
        Commands::PromptDisable { slug, prompt_id } => {
            prompt_disable(&pool, &slug, prompt_id).await
        }
    }
}

async fn analyze(
    pool: &sqlx::PgPool,
    config: &aivis_core::AppConfig,
    domain: &str,
    email: &str,
) -> anyhow::Result<()> {
    validate_submission(domain, email)?;
    let domain = domain.trim().to_lowercase();

    let catalog = aivis_core::load_engine_catalog(&config.engines_path)?;
    let gateway: Arc<dyn EngineQuery> = Arc::new(AnswerGateway::from_catalog(
        &catalog,
        config.engine_request_timeout_secs,
    )?);
    let notifier: Arc<dyn Notifier> = match &config.notification_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url)?),
        None => Arc::new(LogNotifier),
    };
    let store: Arc<dyn RunStore> = Arc::new(PgRunStore::new(pool.clone()));
    let orchestrator = Orchestrator::new(
        store,
        gateway,
        notifier,
        OrchestratorConfig::from_app_config(config, catalog.ids()),
    );

    let brand = aivis_db::find_or_create_brand_by_domain(pool, &domain).await?;
    let prompts = aivis_db::list_active_prompts(pool, brand.id).await?;
    if prompts.is_empty() {
        anyhow::bail!("brand '{}' has no active prompts; add one with prompt-add", brand.slug);
    }

    let run =
        aivis_db::create_analysis_run(pool, brand.id, &domain, email, chrono::Utc::now()).await?;
    println!("run {} queued for {domain}", run.public_id);

    let ctx = RunContext {
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
    };
    let outcome = orchestrator.execute(&ctx).await?;

    println!(
        "run {} finished: state={} persisted={} failed_pairs={} degraded={}",
        run.public_id, outcome.state, outcome.persisted, outcome.failed_pairs, outcome.degraded
    );
    Ok(())
}

async fn score(
    pool: &sqlx::PgPool,
    config: &aivis_core::AppConfig,
    url: &str,
) -> anyhow::Result<()> {
    let url = url.trim();
    validate_url(url)?;

    let extractor = PageExtractor::new(
        config.extract_request_timeout_secs,
        &config.extract_user_agent,
    )?;
    let text = extractor.extract(url).await?;
    let result = score_content(&text, ScoreWeights::default())?;

    let subscores = serde_json::json!({
        "readability": result.readability,
        "sentiment": result.sentiment,
    });
    let row = aivis_db::insert_content_score(
        pool,
        url,
        result.composite,
        result.readability_ease,
        result.sentiment_favorability,
        &subscores,
        chrono::Utc::now(),
    )
    .await?;

    println!("{url}");
    println!("  composite    {:.1}", row.composite_score);
    println!("  readability  {:.1}", row.readability_ease);
    println!("  sentiment    {:.1}", row.sentiment_favorability);
    Ok(())
}

async fn run_compare(
    pool: &sqlx::PgPool,
    config: &aivis_core::AppConfig,
    slug: &str,
) -> anyhow::Result<()> {
    let brand = aivis_db::get_brand_by_slug(pool, slug).await?;
    let competitors = aivis_db::list_competitors(pool, brand.id).await?;

    let depth = i64::try_from(config.trend_window).unwrap_or(7) + 1;
    let mut histories = Vec::with_capacity(competitors.len() + 1);
    for entity in std::iter::once(&brand).chain(competitors.iter()) {
        let points = aivis_db::visibility_history(pool, entity.id, depth, 0).await?;
        histories.push(EntityHistory {
            entity_id: entity.id,
            label: entity.name.clone(),
            points: points
                .into_iter()
                .map(|p| ScorePoint {
                    completed_at: p.completed_at,
                    score: p.score,
                })
                .collect(),
        });
    }

    let result = compare(&histories, config.trend_window);
    for standing in &result.standings {
        let current = standing
            .current
            .map_or_else(|| "    -".to_string(), |s| format!("{s:5.1}"));
        let trend = standing
            .trend
            .map_or_else(|| "    -".to_string(), |t| format!("{t:+5.1}"));
        println!(
            "#{:<2} {:<24} score {current}  trend {trend}  pct {:5.1}",
            standing.rank, standing.label, standing.percentile
        );
    }
    Ok(())
}

async fn list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = aivis_db::list_runs(pool, limit.clamp(1, 200)).await?;
    for run in runs {
        println!(
            "{}  {:<10} {:<24} degraded={} submitted={}",
            run.public_id,
            run.status,
            run.domain,
            run.degraded,
            run.submitted_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

async fn prompt_add(
    pool: &sqlx::PgPool,
    slug: &str,
    text: &str,
    tags: &[String],
) -> anyhow::Result<()> {
    let text = text.trim();
    anyhow::ensure!(!text.is_empty(), "prompt text must not be empty");

    let brand = aivis_db::get_brand_by_slug(pool, slug).await?;
    let prompt = aivis_db::create_prompt(pool, brand.id, text, tags).await?;
    println!("prompt {} added to {}", prompt.id, brand.slug);
    Ok(())
}

async fn prompt_disable(pool: &sqlx::PgPool, slug: &str, prompt_id: i64) -> anyhow::Result<()> {
    let brand = aivis_db::get_brand_by_slug(pool, slug).await?;
    aivis_db::deactivate_prompt(pool, brand.id, prompt_id).await?;
    println!("prompt {prompt_id} deactivated for {}", brand.slug);
    Ok(())
}
