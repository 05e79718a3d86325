use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    storage::{
        types::{
            chunk::Chunk,
            index_manifest::IndexManifest,
            question_entry::{IndexHit, QuestionEntry},
        },
        vector_index::{cosine_similarity, VectorIndex},
    },
};

#[derive(Default)]
struct MemoryState {
    chunks: HashMap<String, Chunk>,
    entries: Vec<QuestionEntry>,
    manifest: Option<IndexManifest>,
}

/// Process-local vector index that scores every entry on each query.
///
/// Suited to tests and small corpora; nothing is persisted.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    state: RwLock<MemoryState>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn store_chunk(&self, chunk: Chunk) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.chunks.insert(chunk.id.clone(), chunk);
        Ok(())
    }

    async fn get_chunk(&self, key: &str) -> Result<Option<Chunk>, AppError> {
        Ok(self.state.read().await.chunks.get(key).cloned())
    }

    async fn insert(&self, entry: QuestionEntry) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if !state.chunks.contains_key(&entry.chunk_key) {
            return Err(AppError::IndexWrite(format!(
                "chunk '{}' must be stored before its questions",
                entry.chunk_key
            )));
        }
        state.entries.push(entry);
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>, AppError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let state = self.state.read().await;
        let mut hits: Vec<IndexHit> = state
            .entries
            .iter()
            .map(|entry| IndexHit {
                entry_id: entry.id.clone(),
                chunk_key: entry.chunk_key.clone(),
                question: entry.question.clone(),
                score: cosine_similarity(embedding, &entry.embedding),
            })
            .collect();

        // Stable sort keeps insertion order between equal scores
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);

        Ok(hits)
    }

    async fn manifest(&self) -> Result<Option<IndexManifest>, AppError> {
        Ok(self.state.read().await.manifest.clone())
    }

    async fn record_manifest(&self, manifest: IndexManifest) -> Result<(), AppError> {
        self.state.write().await.manifest = Some(manifest);
        Ok(())
    }

    async fn len(&self) -> Result<usize, AppError> {
        Ok(self.state.read().await.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_orders_by_similarity_and_truncates() {
        let index = InMemoryVectorIndex::new();
        index
            .store_chunk(Chunk::new("a", "alpha"))
            .await
            .expect("store chunk");
        index
            .store_chunk(Chunk::new("b", "beta"))
            .await
            .expect("store chunk");

        for (key, question, embedding) in [
            ("a", "far", vec![0.0, 1.0]),
            ("b", "near", vec![1.0, 0.0]),
            ("a", "middle", vec![0.7, 0.7]),
        ] {
            index
                .insert(QuestionEntry::new(key.into(), question.into(), embedding))
                .await
                .expect("insert");
        }

        let hits = index.query(&[1.0, 0.0], 2).await.expect("query");

        let questions: Vec<&str> = hits.iter().map(|h| h.question.as_str()).collect();
        assert_eq!(questions, vec!["near", "middle"]);
    }

    #[tokio::test]
    async fn zero_k_and_empty_index_yield_nothing() {
        let index = InMemoryVectorIndex::new();
        assert!(index.query(&[1.0], 3).await.expect("query").is_empty());

        index
            .store_chunk(Chunk::new("a", "alpha"))
            .await
            .expect("store chunk");
        index
            .insert(QuestionEntry::new("a".into(), "q".into(), vec![1.0]))
            .await
            .expect("insert");
        assert!(index.query(&[1.0], 0).await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn orphan_entries_are_rejected() {
        let index = InMemoryVectorIndex::new();
        let result = index
            .insert(QuestionEntry::new("nope".into(), "q".into(), vec![1.0]))
            .await;
        assert!(matches!(result, Err(AppError::IndexWrite(_))));
        assert_eq!(index.len().await.expect("len"), 0);
    }
}
