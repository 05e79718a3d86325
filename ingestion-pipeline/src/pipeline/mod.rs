mod config;
mod context;
mod services;
mod stages;
mod state;

pub use config::IngestionConfig;
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::{
    pin::pin,
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::{types::chunk::Chunk, vector_index::VectorIndex},
    utils::{config::AppConfig, embedding::Embedder},
};
use futures::{stream, StreamExt};
use tracing::info;

use crate::{
    corpus::Corpus,
    generator::{LlmQuestionGenerator, QuestionGenerator},
    indexer::Indexer,
    llm::LanguageModel,
    screening::AnswerabilityScreen,
};

use self::{
    context::PipelineContext,
    stages::{generate, index, screen},
    state::ready,
};

/// Outcome of driving one chunk through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub chunk_key: String,
    /// Questions asked of the generator.
    pub requested: usize,
    pub generated: usize,
    /// Questions left after screening.
    pub kept: usize,
    pub indexed: usize,
    pub duration_ms: u64,
}

#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    pipeline_config: IngestionConfig,
    services: Arc<dyn PipelineServices>,
}

impl IngestionPipeline {
    /// Wires the default generator, optional answerability screen and indexer
    /// from the application config.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: &AppConfig,
    ) -> Self {
        let generator = LlmQuestionGenerator::new(Arc::clone(&model))
            .with_repair_attempts(config.output_repair_attempts);
        let screen = config
            .answerability_check
            .then(|| AnswerabilityScreen::new(model, config.answerability_votes));

        Self::from_components(
            Arc::new(generator),
            screen,
            Indexer::new(embedder, index),
            IngestionConfig::from_app_config(config),
        )
    }

    pub fn from_components(
        generator: Arc<dyn QuestionGenerator>,
        screen: Option<AnswerabilityScreen>,
        indexer: Indexer,
        pipeline_config: IngestionConfig,
    ) -> Self {
        let services = DefaultPipelineServices::new(generator, screen, indexer);
        Self::with_services(pipeline_config, Arc::new(services))
    }

    pub fn with_services(
        pipeline_config: IngestionConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Self {
        Self {
            pipeline_config,
            services,
        }
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Generates, screens and indexes the questions of a single chunk.
    #[tracing::instrument(skip_all, fields(chunk_key = %chunk.key()))]
    pub async fn ingest_chunk(&self, chunk: &Chunk) -> Result<ChunkReport, AppError> {
        let mut ctx = PipelineContext::new(chunk, &self.pipeline_config, self.services.as_ref());

        let machine = ready();

        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = generate(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let generate_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = screen(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let screen_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = index(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let index_duration = stage_start.elapsed();

        let total_ms = Self::duration_millis(pipeline_started.elapsed());
        let generate_ms = Self::duration_millis(generate_duration);
        let screen_ms = Self::duration_millis(screen_duration);
        let index_ms = Self::duration_millis(index_duration);
        info!(
            chunk_key = %ctx.chunk_key,
            requested = ctx.requested,
            generated = ctx.generated,
            question_count = ctx.indexed,
            total_ms,
            generate_ms,
            screen_ms,
            index_ms,
            "chunk indexed"
        );

        Ok(ChunkReport {
            chunk_key: ctx.chunk_key,
            requested: ctx.requested,
            generated: ctx.generated,
            kept: ctx.questions.len(),
            indexed: ctx.indexed,
            duration_ms: total_ms,
        })
    }

    /// Runs every chunk of the corpus in order, at most `concurrency` at a
    /// time, and stops at the first chunk that fails.
    #[tracing::instrument(skip_all, fields(chunk_count = corpus.len()))]
    pub async fn ingest_corpus(&self, corpus: &Corpus) -> Result<Vec<ChunkReport>, AppError> {
        let concurrency = self.pipeline_config.concurrency.max(1);
        let started = Instant::now();

        let mut results = pin!(stream::iter(corpus.chunks())
            .map(|chunk| async move {
                self.ingest_chunk(chunk)
                    .await
                    .map_err(|err| AppError::ChunkFailed {
                        key: chunk.key().to_string(),
                        source: Box::new(err),
                    })
            })
            .buffered(concurrency));

        let mut reports = Vec::with_capacity(corpus.len());
        while let Some(result) = results.next().await {
            match result {
                Ok(report) => reports.push(report),
                Err(err) => {
                    info!(
                        completed = reports.len(),
                        question_count = reports.iter().map(|r| r.indexed).sum::<usize>(),
                        "corpus ingestion stopped early"
                    );
                    return Err(err);
                }
            }
        }

        info!(
            chunk_count = reports.len(),
            question_count = reports.iter().map(|r| r.indexed).sum::<usize>(),
            total_ms = Self::duration_millis(started.elapsed()),
            "corpus ingestion finished"
        );

        Ok(reports)
    }
}
