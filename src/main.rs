use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use resume_pipeline::channels::{CliMessenger, Messenger, TelegramMessenger};
use resume_pipeline::config::AppConfig;
use resume_pipeline::documents::FileDocumentParser;
use resume_pipeline::fetcher::HttpPostingFetcher;
use resume_pipeline::llm::{LlmConfig, create_engine};
use resume_pipeline::store::{MemorySessionStore, RedisSessionStore, SessionStore, spawn_expiry_task};
use resume_pipeline::{Pipeline, PipelineDeps};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    eprintln!("📄 Resume pipeline v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} ({})", config.llm_model, config.llm_backend.as_str());
    eprintln!(
        "   Workers: {}, queue capacity: {}",
        config.pipeline.worker_count, config.pipeline.queue_capacity
    );

    // ── Session store ────────────────────────────────────────────────────
    let store: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            let store = RedisSessionStore::connect(url)
                .await
                .context("failed to connect to Redis")?;
            eprintln!("   Sessions: redis");
            Arc::new(store)
        }
        None => {
            let store = MemorySessionStore::new();
            let _expiry_handle = spawn_expiry_task(Arc::clone(&store), Duration::from_secs(300));
            eprintln!("   Sessions: in-memory");
            store
        }
    };

    // ── Messenger ────────────────────────────────────────────────────────
    let messenger: Arc<dyn Messenger> = match &config.telegram_token {
        Some(token) => {
            let allowed = &config.telegram_allowed_users;
            eprintln!(
                "   Telegram: enabled (allowed: {})",
                if allowed.iter().any(|u| u == "*") {
                    "everyone".to_string()
                } else {
                    allowed.join(", ")
                }
            );
            Arc::new(TelegramMessenger::new(token.clone(), allowed.clone()))
        }
        None => {
            eprintln!("   Messenger: cli (type /upload <path> to send a resume)\n");
            Arc::new(CliMessenger::new())
        }
    };

    // ── Collaborators ────────────────────────────────────────────────────
    let engine = create_engine(&LlmConfig {
        backend: config.llm_backend,
        api_key: config.llm_api_key.clone(),
        model: config.llm_model.clone(),
    })?;
    let fetcher = Arc::new(HttpPostingFetcher::new(
        config.posting_domains.clone(),
        config.pipeline.fetch_timeout,
    ));

    let pipeline = Pipeline::new(
        config.pipeline.clone(),
        PipelineDeps {
            store,
            messenger: Arc::clone(&messenger),
            parser: Arc::new(FileDocumentParser::new()),
            fetcher,
            engine,
        },
    );

    let events = messenger.start().await?;
    pipeline.start();

    tokio::select! {
        _ = pipeline.run(events) => {
            tracing::info!("Messenger stream closed");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("Shutdown requested");
        }
    }

    pipeline.shutdown().await;
    if let Err(e) = messenger.shutdown().await {
        tracing::warn!("Messenger shutdown failed: {}", e);
    }

    Ok(())
}
