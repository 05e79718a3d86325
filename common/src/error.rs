use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Generation error: {0}")]
    Generation(String),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Index write error: {0}")]
    IndexWrite(String),
    #[error("Index query error: {0}")]
    IndexQuery(String),
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
    #[error("Chunk '{key}' failed: {source}")]
    ChunkFailed {
        key: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Wraps a storage failure raised while writing to the vector index.
    pub fn index_write(err: impl std::fmt::Display) -> Self {
        Self::IndexWrite(err.to_string())
    }

    /// Wraps a storage failure raised while querying the vector index.
    pub fn index_query(err: impl std::fmt::Display) -> Self {
        Self::IndexQuery(err.to_string())
    }
}
