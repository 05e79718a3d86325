#![allow(clippy::missing_docs_in_private_items)]

pub mod args;

use std::sync::Arc;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, vector_index::SurrealVectorIndex},
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

pub async fn connect_db(config: &AppConfig) -> Result<SurrealDbClient, AppError> {
    Ok(SurrealDbClient::new(
        &config.surrealdb_address,
        &config.surrealdb_username,
        &config.surrealdb_password,
        &config.surrealdb_namespace,
        &config.surrealdb_database,
    )
    .await?)
}

pub async fn build_embedder(
    config: &AppConfig,
    openai_client: Arc<async_openai::Client<async_openai::config::OpenAIConfig>>,
) -> Result<Arc<EmbeddingProvider>, AppError> {
    let provider = EmbeddingProvider::from_config(config, Some(openai_client)).await?;
    Ok(Arc::new(provider))
}

/// Opens the index for writing, defining the HNSW index for the embedder's
/// dimension if needed.
pub async fn open_index_for_write(
    config: &AppConfig,
    dimension: usize,
) -> Result<Arc<SurrealVectorIndex>, AppError> {
    let db = connect_db(config).await?;
    Ok(Arc::new(SurrealVectorIndex::open(db, dimension).await?))
}

pub async fn open_index_for_read(config: &AppConfig) -> Result<Arc<SurrealVectorIndex>, AppError> {
    let db = connect_db(config).await?;
    Ok(Arc::new(SurrealVectorIndex::attach(db)))
}
