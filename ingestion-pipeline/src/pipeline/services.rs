use std::sync::Arc;

use async_trait::async_trait;
use common::{error::AppError, storage::types::chunk::Chunk};

use crate::{generator::QuestionGenerator, indexer::Indexer, screening::AnswerabilityScreen};

#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn generate_questions(
        &self,
        chunk: &Chunk,
        count: usize,
    ) -> Result<Vec<String>, AppError>;

    /// Filters out questions the chunk cannot answer. Passes everything
    /// through when screening is disabled.
    async fn screen_questions(
        &self,
        chunk: &Chunk,
        questions: Vec<String>,
    ) -> Result<Vec<String>, AppError>;

    async fn index_questions(&self, chunk: &Chunk, questions: &[String])
        -> Result<usize, AppError>;
}

pub struct DefaultPipelineServices {
    generator: Arc<dyn QuestionGenerator>,
    screen: Option<AnswerabilityScreen>,
    indexer: Indexer,
}

impl DefaultPipelineServices {
    pub fn new(
        generator: Arc<dyn QuestionGenerator>,
        screen: Option<AnswerabilityScreen>,
        indexer: Indexer,
    ) -> Self {
        Self {
            generator,
            screen,
            indexer,
        }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn generate_questions(
        &self,
        chunk: &Chunk,
        count: usize,
    ) -> Result<Vec<String>, AppError> {
        self.generator.generate(chunk, count).await
    }

    async fn screen_questions(
        &self,
        chunk: &Chunk,
        questions: Vec<String>,
    ) -> Result<Vec<String>, AppError> {
        match &self.screen {
            Some(screen) => screen.screen(chunk, questions).await,
            None => Ok(questions),
        }
    }

    async fn index_questions(
        &self,
        chunk: &Chunk,
        questions: &[String],
    ) -> Result<usize, AppError> {
        self.indexer.index_chunk(chunk, questions).await
    }
}
