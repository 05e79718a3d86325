use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        indexes::{ensure_question_index, HNSW_SEARCH_EF},
        types::{
            chunk::Chunk,
            index_manifest::{IndexManifest, MANIFEST_ID},
            question_entry::{IndexHit, QuestionEntry},
            StoredObject,
        },
    },
};

/// Append-only store of question embeddings tagged with their chunk key.
///
/// Chunks live next to the entries so every entry can be resolved back to its
/// source content. Implementations must reject entries whose chunk is unknown.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Stores a chunk, replacing any chunk with the same key.
    async fn store_chunk(&self, chunk: Chunk) -> Result<(), AppError>;

    async fn get_chunk(&self, key: &str) -> Result<Option<Chunk>, AppError>;

    async fn insert(&self, entry: QuestionEntry) -> Result<(), AppError>;

    /// Returns up to `k` entries ordered by descending cosine similarity.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>, AppError>;

    async fn manifest(&self) -> Result<Option<IndexManifest>, AppError>;

    async fn record_manifest(&self, manifest: IndexManifest) -> Result<(), AppError>;

    /// Number of question entries held by the index.
    async fn len(&self) -> Result<usize, AppError>;
}

/// Cosine similarity of two vectors. Vectors of different length or with a
/// zero norm score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Vector index backed by SurrealDB tables and an HNSW index with cosine distance.
#[derive(Clone)]
pub struct SurrealVectorIndex {
    db: SurrealDbClient,
}

#[derive(Debug, Deserialize)]
struct HitRow {
    entry_id: String,
    chunk_key: String,
    question: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: usize,
}

impl SurrealVectorIndex {
    /// Opens the index for writing `dimension`-sized vectors.
    ///
    /// An index that already carries a manifest keeps its HNSW definition; a
    /// writer with a different dimension is refused before anything is touched.
    pub async fn open(db: SurrealDbClient, dimension: usize) -> Result<Self, AppError> {
        let existing = db
            .get_item::<IndexManifest>(MANIFEST_ID)
            .await
            .map_err(AppError::index_write)?;

        if let Some(manifest) = existing {
            if manifest.dimension != dimension {
                return Err(AppError::IndexWrite(format!(
                    "index was built with {}-dimensional embeddings, got {} dimensions",
                    manifest.dimension, dimension
                )));
            }
        }

        ensure_question_index(&db, dimension).await?;
        Ok(Self { db })
    }

    /// Attaches to an index without touching its definition. Used by readers,
    /// which check compatibility through the manifest instead.
    pub fn attach(db: SurrealDbClient) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &SurrealDbClient {
        &self.db
    }
}

#[async_trait]
impl VectorIndex for SurrealVectorIndex {
    async fn store_chunk(&self, chunk: Chunk) -> Result<(), AppError> {
        self.db
            .upsert_item(chunk)
            .await
            .map_err(AppError::index_write)?;
        Ok(())
    }

    async fn get_chunk(&self, key: &str) -> Result<Option<Chunk>, AppError> {
        self.db
            .get_item::<Chunk>(key)
            .await
            .map_err(AppError::index_query)
    }

    async fn insert(&self, entry: QuestionEntry) -> Result<(), AppError> {
        let owner = self
            .db
            .get_item::<Chunk>(&entry.chunk_key)
            .await
            .map_err(AppError::index_write)?;
        if owner.is_none() {
            return Err(AppError::IndexWrite(format!(
                "chunk '{}' must be stored before its questions",
                entry.chunk_key
            )));
        }

        self.db
            .store_item(entry)
            .await
            .map_err(AppError::index_write)?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>, AppError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let ef = HNSW_SEARCH_EF.max(k);
        let query = format!(
            "SELECT meta::id(id) AS entry_id, chunk_key, question, \
             vector::similarity::cosine(embedding, $embedding) AS score \
             FROM {table} WHERE embedding <|{k},{ef}|> $embedding \
             ORDER BY score DESC",
            table = QuestionEntry::table_name(),
        );

        let rows: Vec<HitRow> = self
            .db
            .client
            .query(query)
            .bind(("embedding", embedding.to_vec()))
            .await
            .map_err(AppError::index_query)?
            .take(0)
            .map_err(AppError::index_query)?;

        debug!(requested = k, returned = rows.len(), "vector index query");

        Ok(rows
            .into_iter()
            .take(k)
            .map(|row| IndexHit {
                entry_id: row.entry_id,
                chunk_key: row.chunk_key,
                question: row.question,
                score: row.score,
            })
            .collect())
    }

    async fn manifest(&self) -> Result<Option<IndexManifest>, AppError> {
        self.db
            .get_item::<IndexManifest>(MANIFEST_ID)
            .await
            .map_err(AppError::index_query)
    }

    async fn record_manifest(&self, manifest: IndexManifest) -> Result<(), AppError> {
        self.db
            .upsert_item(manifest)
            .await
            .map_err(AppError::index_write)?;
        Ok(())
    }

    async fn len(&self) -> Result<usize, AppError> {
        let query = format!(
            "SELECT count() FROM {} GROUP ALL",
            QuestionEntry::table_name()
        );
        let row: Option<CountRow> = self
            .db
            .client
            .query(query)
            .await
            .map_err(AppError::index_query)?
            .take(0)
            .map_err(AppError::index_query)?;

        Ok(row.map_or(0, |row| row.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn setup_index() -> SurrealVectorIndex {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        SurrealVectorIndex::open(db, 3)
            .await
            .expect("Failed to open vector index")
    }

    #[test]
    fn cosine_similarity_handles_degenerate_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).abs() < 1e-6);
    }

    #[tokio::test]
    async fn empty_index_returns_no_hits() {
        let index = setup_index().await;

        let hits = index
            .query(&[0.1, 0.2, 0.3], 5)
            .await
            .expect("query on empty index");

        assert!(hits.is_empty());
        assert_eq!(index.len().await.expect("len"), 0);
    }

    #[tokio::test]
    async fn insert_requires_the_owning_chunk() {
        let index = setup_index().await;
        let orphan = QuestionEntry::new("missing".into(), "Who am I?".into(), vec![1.0, 0.0, 0.0]);

        let result = index.insert(orphan).await;

        assert!(matches!(result, Err(AppError::IndexWrite(_))));
    }

    #[tokio::test]
    async fn query_ranks_nearest_question_first() {
        let index = setup_index().await;
        index
            .store_chunk(Chunk::new("sky", "The sky is blue due to Rayleigh scattering."))
            .await
            .expect("store sky chunk");
        index
            .store_chunk(Chunk::new("grass", "Grass is green because of chlorophyll."))
            .await
            .expect("store grass chunk");

        index
            .insert(QuestionEntry::new(
                "sky".into(),
                "Why is the sky blue?".into(),
                vec![0.9, 0.1, 0.0],
            ))
            .await
            .expect("insert sky question");
        index
            .insert(QuestionEntry::new(
                "grass".into(),
                "Why is grass green?".into(),
                vec![0.1, 0.9, 0.0],
            ))
            .await
            .expect("insert grass question");

        let hits = index
            .query(&[0.85, 0.15, 0.0], 2)
            .await
            .expect("query succeeds");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits.first().map(|h| h.chunk_key.as_str()), Some("sky"));
        assert!(hits.windows(2).all(|pair| match pair {
            [a, b] => a.score >= b.score,
            _ => true,
        }));
        assert_eq!(index.len().await.expect("len"), 2);

        let chunk = index
            .get_chunk("grass")
            .await
            .expect("fetch chunk")
            .expect("chunk exists");
        assert_eq!(chunk.text, "Grass is green because of chlorophyll.");
    }

    #[tokio::test]
    async fn manifest_round_trips() {
        let index = setup_index().await;
        assert!(index.manifest().await.expect("manifest").is_none());

        index
            .record_manifest(IndexManifest::new("hashed", None, 3))
            .await
            .expect("record manifest");

        let manifest = index
            .manifest()
            .await
            .expect("manifest")
            .expect("manifest present");
        assert_eq!(manifest.dimension, 3);
        assert_eq!(manifest.backend, "hashed");
    }

    #[tokio::test]
    async fn attached_reader_sees_written_entries() {
        let index = setup_index().await;
        index
            .store_chunk(Chunk::new("sky", "The sky is blue."))
            .await
            .expect("store chunk");
        index
            .insert(QuestionEntry::new(
                "sky".into(),
                "Why is the sky blue?".into(),
                vec![1.0, 0.0, 0.0],
            ))
            .await
            .expect("insert");

        let reader = SurrealVectorIndex::attach(index.db().clone());

        assert_eq!(reader.len().await.expect("len"), 1);
        let hits = reader.query(&[1.0, 0.0, 0.0], 1).await.expect("query");
        assert_eq!(hits.first().map(|h| h.question.as_str()), Some("Why is the sky blue?"));
    }

    #[tokio::test]
    async fn reopening_with_other_dimension_keeps_existing_index() {
        let index = setup_index().await;
        index
            .record_manifest(IndexManifest::new("hashed", None, 3))
            .await
            .expect("record manifest");
        index
            .store_chunk(Chunk::new("sky", "The sky is blue."))
            .await
            .expect("store chunk");
        index
            .insert(QuestionEntry::new(
                "sky".into(),
                "Why is the sky blue?".into(),
                vec![1.0, 0.0, 0.0],
            ))
            .await
            .expect("insert");

        let reopened = SurrealVectorIndex::open(index.db().clone(), 8).await;
        assert!(matches!(reopened, Err(AppError::IndexWrite(_))));

        let reader = SurrealVectorIndex::attach(index.db().clone());
        let hits = reader.query(&[1.0, 0.0, 0.0], 1).await.expect("query");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().map(|h| h.chunk_key.as_str()), Some("sky"));

        let same = SurrealVectorIndex::open(index.db().clone(), 3).await;
        assert!(same.is_ok());
    }
}
