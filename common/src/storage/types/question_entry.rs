use uuid::Uuid;

use crate::stored_object;

stored_object!(QuestionEntry, "question_entry", {
    /// Key of the chunk the question was generated from
    chunk_key: String,
    /// The generated question text
    question: String,
    /// Embedding of `question`
    embedding: Vec<f32>
});

impl QuestionEntry {
    pub fn new(chunk_key: String, question: String, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            chunk_key,
            question,
            embedding,
        }
    }
}

/// A question entry returned by a nearest-neighbour search.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub entry_id: String,
    pub chunk_key: String,
    pub question: String,
    /// Cosine similarity between the query vector and the stored question vector.
    pub score: f32,
}
