// Entry point of the MetricMaster bot process.
//
// **Architecture Overview:**
// - `core/` = Business logic (tool catalog, dispatch, GA4/GTM services, reports)
// - `infra/` = Implementations of core traits (Google APIs, host API, SQLite, GitHub)
// - `host/` = The Flexus side: line protocol, event loop, config, installer
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Either register the bot in a workspace or run the event loop

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "host/host_layer.rs"]
mod host;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::core::analytics::{AnalyticsService, EnhancedAnalyticsTool, GoogleAnalyticsTool};
use crate::core::auth::TokenProvider;
use crate::core::deploy::SnippetDeployer;
use crate::core::dispatch::{AskQuestionsTool, Dispatcher, ToolCallHandler};
use crate::core::documents::PolicyDocumentTool;
use crate::core::reports::{ReportService, ReportStoreTool};
use crate::core::scheduler::ScheduledRunner;
use crate::core::setup::{setup_schema, SetupConfig};
use crate::core::tag_manager::{TagManagerService, TagManagerTool};
use crate::host::bot_config::BotConfig;
use crate::host::event_loop::BotEventLoop;
use crate::host::installer;
use crate::host::stdio_transport::{stdin_source, stdout_sink};
use crate::infra::github::GithubApiClient;
use crate::infra::google::{GoogleAnalyticsClient, ServiceAccountTokens, TagManagerApiClient};
use crate::infra::host::HostApiClient;
use crate::infra::reports::SqliteReportStore;

#[derive(Debug, Parser)]
#[command(name = "metricmaster", version, about = "GA4 and Tag Manager bot for Flexus")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve tool calls from the host over stdin/stdout (default).
    Run,
    /// Register or update the bot in a workspace marketplace.
    Install {
        #[arg(long = "ws")]
        ws_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = BotConfig::from_env()?;
    let host = HostApiClient::new(&config.api_base_url, &config.api_key)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Install { ws_id } => installer::install(&ws_id, &host, &config.assets_dir).await,
        Command::Run => run(config, host).await,
    }
}

async fn run(config: BotConfig, host: HostApiClient) -> anyhow::Result<()> {
    let persona_id = config
        .persona_id
        .clone()
        .context("Missing FLEXUS_PERSONA_ID environment variable")?;
    let persona = host
        .fetch_persona(&persona_id)
        .await?
        .with_context(|| format!("persona {} not found on host", persona_id))?;
    let setup = SetupConfig::mix(&setup_schema(), &persona.setup);

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let tokens: Arc<dyn TokenProvider> = match ServiceAccountTokens::from_env().await? {
        Some(service_account) => {
            tracing::info!(
                client_email = service_account.client_email(),
                "Using Google service account credentials"
            );
            Arc::new(service_account)
        }
        None => Arc::new(host.clone()),
    };

    let http = reqwest::Client::new();
    let analytics = Arc::new(AnalyticsService::new(Arc::new(GoogleAnalyticsClient::new(
        http.clone(),
    ))));
    let tag_manager = Arc::new(TagManagerService::new(Arc::new(TagManagerApiClient::new(
        http,
    ))));

    let reports_db = config.reports_db_path();
    let report_store = SqliteReportStore::new(&reports_db.to_string_lossy()).await?;
    let documents = Arc::new(host.documents(&persona.ws_id));
    let reports = Arc::new(ReportService::new(
        Arc::clone(&analytics),
        Arc::new(report_store),
        documents.clone(),
    ));

    let deployer: Option<Arc<dyn SnippetDeployer>> = match config.github_token.clone() {
        Some(token) => Some(Arc::new(GithubApiClient::new(Some(token))?)),
        None => {
            tracing::info!("GITHUB_TOKEN not set, snippet deployment disabled");
            None
        }
    };

    let handlers: Vec<Arc<dyn ToolCallHandler>> = vec![
        Arc::new(GoogleAnalyticsTool::new(Arc::clone(&analytics))),
        Arc::new(EnhancedAnalyticsTool::new(Arc::clone(&analytics))),
        Arc::new(TagManagerTool::new(tag_manager, deployer)),
        Arc::new(PolicyDocumentTool::new(documents)),
        Arc::new(ReportStoreTool::new(Arc::clone(&reports))),
        Arc::new(AskQuestionsTool),
    ];

    let dispatcher = Dispatcher::new(handlers, tokens, persona, setup);
    let runner = ScheduledRunner::new(reports, config.timezone);

    tracing::info!(
        persona_id = %persona_id,
        timezone = %config.timezone,
        "MetricMaster is ready"
    );

    let mut event_loop = BotEventLoop::new(dispatcher, runner);
    event_loop
        .run(&mut stdin_source(), &mut stdout_sink())
        .await?;

    tracing::info!("Event loop stopped");
    Ok(())
}
