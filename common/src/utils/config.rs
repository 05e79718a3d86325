use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::utils::embedding::EmbeddingBackend;

/// How the matcher treats several hits that point at the same chunk.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Return every matched question, even when chunks repeat.
    #[default]
    KeepAll,
    /// Keep only the highest scoring hit for each chunk.
    BestPerChunk,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_questions_per_chunk")]
    pub questions_per_chunk: usize,
    /// When set, the question count scales with chunk length instead of being fixed.
    #[serde(default)]
    pub questions_chars_per_question: Option<usize>,
    #[serde(default = "default_questions_min")]
    pub questions_min: usize,
    #[serde(default)]
    pub answerability_check: bool,
    #[serde(default = "default_answerability_votes")]
    pub answerability_votes: u8,
    #[serde(default)]
    pub output_repair_attempts: u32,
    #[serde(default = "default_ingest_concurrency")]
    pub ingest_concurrency: usize,
    #[serde(default = "default_match_top_k")]
    pub match_top_k: usize,
    #[serde(default)]
    pub match_duplicate_policy: DuplicatePolicy,
    #[serde(default = "default_candidate_multiplier")]
    pub match_candidate_multiplier: usize,
    #[serde(default)]
    pub match_score_threshold: Option<f32>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_questions_per_chunk() -> usize {
    10
}

fn default_questions_min() -> usize {
    1
}

fn default_answerability_votes() -> u8 {
    1
}

fn default_ingest_concurrency() -> usize {
    1
}

fn default_match_top_k() -> usize {
    5
}

fn default_candidate_multiplier() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "qbrag".to_string(),
            surrealdb_database: "qbrag".to_string(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_model: None,
            embedding_dimensions: default_embedding_dimensions(),
            generation_model: default_generation_model(),
            questions_per_chunk: default_questions_per_chunk(),
            questions_chars_per_question: None,
            questions_min: default_questions_min(),
            answerability_check: false,
            answerability_votes: default_answerability_votes(),
            output_repair_attempts: 0,
            ingest_concurrency: default_ingest_concurrency(),
            match_top_k: default_match_top_k(),
            match_duplicate_policy: DuplicatePolicy::default(),
            match_candidate_multiplier: default_candidate_multiplier(),
            match_score_threshold: None,
        }
    }
}

impl AppConfig {
    /// Builds an OpenAI-compatible client from the configured key and base url.
    pub fn openai_client(&self) -> async_openai::Client<async_openai::config::OpenAIConfig> {
        async_openai::Client::with_config(
            async_openai::config::OpenAIConfig::new()
                .with_api_key(&self.openai_api_key)
                .with_api_base(&self.openai_base_url),
        )
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
