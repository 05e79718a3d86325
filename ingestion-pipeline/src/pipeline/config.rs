use common::utils::config::AppConfig;

use crate::generator::QuestionBudget;

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub budget: QuestionBudget,
    /// Chunks processed at once; 1 runs the corpus sequentially.
    pub concurrency: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            budget: QuestionBudget::default(),
            concurrency: 1,
        }
    }
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            budget: QuestionBudget::from_config(config),
            concurrency: config.ingest_concurrency.max(1),
        }
    }
}
