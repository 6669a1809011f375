use anyhow::Context;
use rag_api::api::{self, AppContext};
use rag_api::config::{self, Config};
use rag_api::embeddings::FastEmbedProvider;
use rag_api::synthesis::{AnswerSynthesizer, OpenAiClient, PromptTemplates};
use rag_api::vector_store::VectorStore;
use std::sync::Arc;
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = config::load_dotenv_files();
    let config = Config::from_env();

    let level = match &config {
        Ok(config) if config.debug => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    for load in &dotenv {
        load.log();
    }
    let config = config.context("Failed to load configuration")?;

    tracing::info!(?config, "Starting RAG API server...");

    let embedder = Arc::new(FastEmbedProvider::new());
    let store = VectorStore::from_config(config.vector_store(), embedder)
        .await
        .context("Failed to open vector store")?;

    let client = OpenAiClient::new(config.openai_api_key.clone())
        .with_base_url(config.openai_base_url.clone())
        .with_model(config.openai_model.clone())
        .with_max_tokens(config.max_tokens);
    tracing::info!(model = client.model(), "Configured completion client");

    let synthesizer = AnswerSynthesizer::new(
        PromptTemplates::new(config.prompts_dir.clone()),
        Arc::new(client),
    );

    let ctx = AppContext::new(
        Arc::new(store),
        Arc::new(synthesizer),
        config.api_password.as_str(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, api::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
