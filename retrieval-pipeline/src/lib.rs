#![allow(clippy::missing_docs_in_private_items)]

pub mod config;
pub mod scoring;

use std::{sync::Arc, time::Instant};

use common::{
    error::AppError,
    storage::{
        types::{chunk::Chunk, index_manifest::IndexManifest},
        vector_index::VectorIndex,
    },
    utils::{config::DuplicatePolicy, embedding::Embedder},
};
use tracing::{debug, instrument, warn};

pub use config::{DuplicateMode, MatchConfig};

/// A chunk reached through one of its pre-generated questions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMatch {
    pub chunk_key: String,
    pub score: f32,
    /// The stored question the query matched.
    pub question: String,
}

/// Resolved chunk content handed to a downstream prompt as retrieval context.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub question: String,
}

/// Online half of the system: embeds a query and finds the chunks whose
/// generated questions are closest to it.
pub struct Matcher {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: MatchConfig,
}

impl Matcher {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self::with_config(embedder, index, MatchConfig::default())
    }

    pub fn with_config(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: MatchConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Returns up to `k` (chunk key, score) pairs, best first.
    #[instrument(skip_all, fields(k = k))]
    pub async fn match_query(&self, query: &str, k: usize) -> Result<Vec<ChunkMatch>, AppError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.trim().is_empty() {
            debug!("blank query, nothing to match");
            return Ok(Vec::new());
        }

        let Some(manifest) = self.index.manifest().await? else {
            debug!("index has no entries yet");
            return Ok(Vec::new());
        };
        manifest.ensure_queryable(&IndexManifest::new(
            self.embedder.backend_label(),
            self.embedder.model_code(),
            self.embedder.dimension(),
        ))?;

        let started = Instant::now();
        let embedding = self.embedder.embed(query).await?;
        if embedding.len() != manifest.dimension {
            return Err(AppError::index_query(format!(
                "query embedding has {} dimensions, index expects {}",
                embedding.len(),
                manifest.dimension
            )));
        }
        let embed_ms = elapsed_millis(started);

        let candidates = self.config.candidates_for(k);
        let started = Instant::now();
        let mut hits = self.index.query(&embedding, candidates).await?;
        let search_ms = elapsed_millis(started);

        scoring::sort_by_score_desc(&mut hits);
        let mut hits = scoring::apply_threshold(hits, self.config.score_threshold);
        if self.config.duplicate_policy == DuplicatePolicy::BestPerChunk {
            hits = scoring::best_per_chunk(hits);
        }
        hits.truncate(k);

        debug!(
            candidates,
            returned = hits.len(),
            embed_ms,
            search_ms,
            "query matched"
        );

        Ok(hits
            .into_iter()
            .map(|hit| ChunkMatch {
                chunk_key: hit.chunk_key,
                score: hit.score,
                question: hit.question,
            })
            .collect())
    }

    /// Like [`Matcher::match_query`] but resolves each key to its stored chunk.
    /// Keys without a stored chunk are skipped.
    pub async fn retrieve_context(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        let matches = self.match_query(query, k).await?;
        let mut retrieved = Vec::with_capacity(matches.len());
        for matched in matches {
            match self.index.get_chunk(&matched.chunk_key).await? {
                Some(chunk) => retrieved.push(RetrievedChunk {
                    chunk,
                    score: matched.score,
                    question: matched.question,
                }),
                None => warn!(
                    chunk_key = %matched.chunk_key,
                    "matched chunk missing from store; skipping"
                ),
            }
        }
        Ok(retrieved)
    }
}

fn elapsed_millis(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
