use async_trait::async_trait;
use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::chunk::Chunk},
    utils::embedding::EmbeddingProvider,
};
use ingestion_pipeline::{CompletionRequest, Corpus, LanguageModel};
use std::sync::Arc;
use uuid::Uuid;

pub const EMBEDDING_DIMENSION: usize = 64;

/// Sets up an isolated in-memory test database
pub async fn setup_test_database() -> SurrealDbClient {
    let namespace = "test_ns";
    let database = Uuid::new_v4().to_string();

    SurrealDbClient::memory(namespace, &database)
        .await
        .expect("Failed to start in-memory surrealdb")
}

pub fn hashed_embedder() -> Arc<EmbeddingProvider> {
    Arc::new(
        EmbeddingProvider::new_hashed(EMBEDDING_DIMENSION).expect("Failed to build hashed embedder"),
    )
}

pub fn sky_chunk() -> Chunk {
    Chunk::from_text("The sky is blue due to Rayleigh scattering.")
}

pub fn grass_chunk() -> Chunk {
    Chunk::new("grass", "Grass is green because of chlorophyll.")
}

pub fn weather_corpus() -> Corpus {
    Corpus::new(vec![sky_chunk(), grass_chunk()])
}

/// Writes topic questions for whichever chunk the request carries.
pub struct TopicModel;

#[async_trait]
impl LanguageModel for TopicModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>, AppError> {
        let questions = if request.user.contains("Grass is green") {
            vec![
                "Why is grass green?",
                "Which pigment colors grass?",
                "What does chlorophyll do to grass?",
            ]
        } else if request.user.contains("The sky is blue") {
            vec![
                "Why is the sky blue?",
                "What causes the blue color of the sky?",
                "Which scattering makes the sky blue?",
            ]
        } else {
            return Err(AppError::Generation("unexpected chunk".into()));
        };

        let reply = serde_json::json!({ "questions": questions }).to_string();
        Ok(vec![reply; usize::from(request.choices)])
    }
}
