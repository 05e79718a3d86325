use std::sync::Arc;

use common::{
    error::AppError,
    storage::{
        types::{chunk::Chunk, index_manifest::IndexManifest, question_entry::QuestionEntry},
        vector_index::VectorIndex,
    },
    utils::embedding::Embedder,
};
use tracing::{debug, info};

/// Embeds generated questions and appends them to the vector index.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    fn embedder_manifest(&self) -> IndexManifest {
        IndexManifest::new(
            self.embedder.backend_label(),
            self.embedder.model_code(),
            self.embedder.dimension(),
        )
    }

    /// Records the embedder manifest on first write, or checks that the
    /// existing one describes a compatible embedding space.
    async fn ensure_manifest(&self) -> Result<(), AppError> {
        let current = self.embedder_manifest();
        match self.index.manifest().await? {
            Some(existing) => existing.ensure_writable(&current),
            None => {
                info!(
                    backend = %current.backend,
                    model = ?current.model,
                    dimension = current.dimension,
                    "recording index manifest"
                );
                self.index.record_manifest(current).await
            }
        }
    }

    /// Stores `chunk` and one entry per question. Returns the number of
    /// entries written.
    pub async fn index_chunk(&self, chunk: &Chunk, questions: &[String]) -> Result<usize, AppError> {
        self.ensure_manifest().await?;
        self.index.store_chunk(chunk.clone()).await?;

        if questions.is_empty() {
            debug!(chunk_key = %chunk.key(), "chunk stored without questions");
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(questions.to_vec()).await?;
        if embeddings.len() != questions.len() {
            return Err(AppError::Embedding(format!(
                "expected {} embeddings, received {}",
                questions.len(),
                embeddings.len()
            )));
        }

        let dimension = self.embedder.dimension();
        if let Some(bad) = embeddings.iter().find(|vector| vector.len() != dimension) {
            return Err(AppError::Embedding(format!(
                "embedding has {} dimensions, index expects {dimension}",
                bad.len()
            )));
        }

        for (question, embedding) in questions.iter().zip(embeddings) {
            let entry = QuestionEntry::new(chunk.key().to_string(), question.clone(), embedding);
            self.index.insert(entry).await?;
        }

        debug!(
            chunk_key = %chunk.key(),
            question_count = questions.len(),
            "questions indexed"
        );

        Ok(questions.len())
    }
}
