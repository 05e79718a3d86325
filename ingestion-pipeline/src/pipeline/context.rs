use common::{error::AppError, storage::types::chunk::Chunk};
use tracing::error;

use super::{config::IngestionConfig, services::PipelineServices};

pub struct PipelineContext<'a> {
    pub chunk: &'a Chunk,
    pub chunk_key: String,
    pub pipeline_config: &'a IngestionConfig,
    pub services: &'a dyn PipelineServices,
    pub requested: usize,
    pub generated: usize,
    pub questions: Vec<String>,
    pub indexed: usize,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        chunk: &'a Chunk,
        pipeline_config: &'a IngestionConfig,
        services: &'a dyn PipelineServices,
    ) -> Self {
        Self {
            chunk,
            chunk_key: chunk.key().to_string(),
            pipeline_config,
            services,
            requested: 0,
            generated: 0,
            questions: Vec::new(),
            indexed: 0,
        }
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        error!(
            chunk_key = %self.chunk_key,
            error = %err,
            "question pipeline aborted"
        );
        err
    }
}
