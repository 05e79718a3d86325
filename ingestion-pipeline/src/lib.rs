#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod corpus;
pub mod generator;
pub mod indexer;
pub mod llm;
pub mod pipeline;
pub mod screening;
pub mod utils;

pub use corpus::Corpus;
pub use generator::{LlmQuestionGenerator, QuestionBudget, QuestionGenerator};
pub use indexer::Indexer;
pub use llm::{CompletionRequest, LanguageModel, OpenAiLanguageModel};
pub use pipeline::{ChunkReport, IngestionConfig, IngestionPipeline};
pub use screening::AnswerabilityScreen;
