use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use examforge::ai::parser::PlainTextParser;
use examforge::ai::providers::create_providers;
use examforge::api::{create_router, AppState};
use examforge::config::Config;
use examforge::database::{apply_attempt_policy, init_pool};
use examforge::error::{CoreError, CoreResult};
use examforge::exam::grading::GradingEngine;
use examforge::progress::flagging::FeedbackService;
use examforge::progress::ledger::ProgressLedger;
use examforge::rag::ingest::IngestionPipeline;
use examforge::rag::retrieval::RetrievalEngine;
use examforge::rag::vector_index::SimpleVectorIndex;

#[tokio::main]
async fn main() -> CoreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let pool = init_pool(&config.database_url).await?;
    apply_attempt_policy(&pool, config.allow_concurrent_attempts).await?;

    let (llm, embeddings) = create_providers(&config)?;
    let index = Arc::new(SimpleVectorIndex::new(config.embedding_dimensions));
    examforge::rag::ingest::rebuild_index(&pool, index.as_ref()).await?;
    let parser = Arc::new(PlainTextParser);

    let ledger = Arc::new(ProgressLedger::new(pool.clone(), &config));
    let retrieval = Arc::new(RetrievalEngine::new(
        pool.clone(),
        embeddings.clone(),
        llm.clone(),
        index.clone(),
        &config,
    )?);
    let grading = Arc::new(GradingEngine::new(
        pool.clone(),
        llm,
        ledger.clone(),
        &config,
    ));
    let ingestion = Arc::new(IngestionPipeline::new(
        pool.clone(),
        parser,
        embeddings,
        index,
        ledger.clone(),
        &config,
    )?);
    let feedback = Arc::new(FeedbackService::new(pool.clone()));

    let state = AppState {
        pool,
        retrieval,
        grading,
        ingestion,
        feedback,
        ledger,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| {
            CoreError::Configuration(format!("cannot bind {}: {}", config.bind_address, e))
        })?;
    tracing::info!("listening on {}", config.bind_address);

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| CoreError::Configuration(format!("server error: {}", e)))?;

    Ok(())
}
