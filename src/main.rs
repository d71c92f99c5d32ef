use std::sync::Arc;

use anyhow::Context;

use fitplan::api::{AppState, SessionRegistry, api_routes};
use fitplan::config::AppConfig;
use fitplan::llm::{LlmBackend, LlmConfig, create_provider};
use fitplan::onboarding::{LlmPlanGenerator, PlanOrchestrator};
use fitplan::routing::{AppRouter, CompletionSignal};
use fitplan::store::{FileFlagCache, LibSqlUserStore, PersistenceGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    eprintln!("🏋️ fitplan v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);

    // ── LLM ──────────────────────────────────────────────────────────────
    let llm = create_provider(&LlmConfig {
        backend: LlmBackend::Gemini,
        api_key: config.gemini_api_key.clone(),
        model: config.model.clone(),
    });
    if config.gemini_api_key.is_none() {
        eprintln!("   Warning: GEMINI_API_KEY not set, onboarding will complete without plans");
    }

    // ── Persistence ──────────────────────────────────────────────────────
    let store = LibSqlUserStore::new_local(&config.db_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;
    eprintln!("   Database: {}", config.db_path.display());

    let cache = FileFlagCache::open(&config.cache_path)
        .await
        .with_context(|| format!("failed to open cache at {}", config.cache_path.display()))?;
    eprintln!("   Onboarding cache: {}\n", config.cache_path.display());

    let gateway = PersistenceGateway::new(Arc::new(store), Arc::new(cache));

    // ── Onboarding ───────────────────────────────────────────────────────
    let signal = CompletionSignal::new();
    let generator = Arc::new(LlmPlanGenerator::new(llm, &config.orchestrator));
    let orchestrator = Arc::new(PlanOrchestrator::new(
        generator,
        gateway.clone(),
        signal.clone(),
        config.orchestrator.clone(),
    ));

    let state = AppState {
        sessions: SessionRegistry::new(),
        orchestrator,
        gateway: gateway.clone(),
        router: AppRouter::new(gateway, signal),
    };

    // ── HTTP ─────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "API server started");

    axum::serve(listener, api_routes(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Ctrl+C received, shutting down...");
        })
        .await
        .context("server error")?;

    Ok(())
}
