use std::path::PathBuf;

use clap::Parser;
use common::utils::{config::AppConfig, embedding::EmbeddingBackend};
use retrieval_pipeline::DuplicateMode;

/// Generate questions for every chunk of a corpus and index them.
#[derive(Debug, Clone, Parser)]
#[command(name = "indexer", version)]
pub struct IndexerArgs {
    /// Corpus file: `.jsonl` records or blank-line separated plain text
    #[arg(long, short = 'c')]
    pub corpus: PathBuf,

    /// Questions requested per chunk (upper bound when scaling by length)
    #[arg(long, short = 'n')]
    pub questions: Option<usize>,

    /// Request one question per this many characters of chunk text
    #[arg(long)]
    pub chars_per_question: Option<usize>,

    /// Chunks processed at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Keep only questions the model judges answerable from the chunk
    ///
    /// Off by default. Question-based conversion pipelines usually screen every
    /// generated question this way; enable it to get that behaviour.
    #[arg(long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    pub answerability: bool,

    /// Completions sampled for the answerability vote
    #[arg(long)]
    pub votes: Option<u8>,

    /// Times a malformed question list is sent back for repair
    #[arg(long)]
    pub repair_attempts: Option<u32>,

    /// Override the configured generation model
    #[arg(long, env = "GENERATION_MODEL")]
    pub model: Option<String>,

    /// Override the configured embedding backend (openai, fastembed, hashed)
    #[arg(long)]
    pub embedding_backend: Option<EmbeddingBackend>,
}

impl IndexerArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(questions) = self.questions {
            config.questions_per_chunk = questions;
        }
        if self.chars_per_question.is_some() {
            config.questions_chars_per_question = self.chars_per_question;
        }
        if let Some(concurrency) = self.concurrency {
            config.ingest_concurrency = concurrency.max(1);
        }
        if self.answerability {
            config.answerability_check = true;
        }
        if let Some(votes) = self.votes {
            config.answerability_votes = votes.max(1);
        }
        if let Some(attempts) = self.repair_attempts {
            config.output_repair_attempts = attempts;
        }
        if let Some(model) = &self.model {
            config.generation_model.clone_from(model);
        }
        if let Some(backend) = self.embedding_backend {
            config.embedding_backend = backend;
        }
    }
}

/// Match a question against the indexed questions and print the source chunks.
#[derive(Debug, Clone, Parser)]
#[command(name = "matcher", version)]
pub struct MatcherArgs {
    /// The incoming user question
    pub query: String,

    /// Number of results
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// How repeated chunks are handled
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicateMode>,

    /// Drop hits scoring below this similarity
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Print the chunk text of every hit
    #[arg(long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    pub context: bool,

    /// Override the configured embedding backend (openai, fastembed, hashed)
    #[arg(long)]
    pub embedding_backend: Option<EmbeddingBackend>,
}

impl MatcherArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(k) = self.top_k {
            config.match_top_k = k;
        }
        if let Some(mode) = self.duplicates {
            config.match_duplicate_policy = mode.into();
        }
        if self.threshold.is_some() {
            config.match_score_threshold = self.threshold;
        }
        if let Some(backend) = self.embedding_backend {
            config.embedding_backend = backend;
        }
    }
}
