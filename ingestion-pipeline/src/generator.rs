use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use common::{error::AppError, storage::types::chunk::Chunk, utils::config::AppConfig};
use serde::Deserialize;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::{
    llm::{CompletionRequest, LanguageModel},
    utils::{
        llm_instructions::{
            output_repair_user_message, question_schema, QuestionPrompt,
            OUTPUT_REPAIR_SYSTEM_MESSAGE,
        },
        strip_code_fence,
    },
};

/// Produces candidate questions answerable from a chunk.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Returns at most `count` non-empty questions, in the order the model gave them.
    async fn generate(&self, chunk: &Chunk, count: usize) -> Result<Vec<String>, AppError>;
}

/// How many questions to request for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionBudget {
    Fixed(usize),
    /// One question per `chars_per_question` characters, clamped to `min..=max`.
    ScaledByLength {
        chars_per_question: usize,
        min: usize,
        max: usize,
    },
}

impl Default for QuestionBudget {
    fn default() -> Self {
        Self::Fixed(10)
    }
}

impl QuestionBudget {
    pub fn from_config(config: &AppConfig) -> Self {
        match config.questions_chars_per_question {
            Some(chars_per_question) => Self::ScaledByLength {
                chars_per_question,
                min: config.questions_min,
                max: config.questions_per_chunk,
            },
            None => Self::Fixed(config.questions_per_chunk),
        }
    }

    pub fn for_chunk(&self, chunk: &Chunk) -> usize {
        match *self {
            Self::Fixed(count) => count,
            Self::ScaledByLength {
                chars_per_question,
                min,
                max,
            } => {
                let chars = chunk.text.chars().count();
                let scaled = chars.div_ceil(chars_per_question.max(1));
                scaled.clamp(min.min(max), max)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionList {
    questions: Vec<String>,
}

/// Question generator that prompts a language model for a JSON list of questions.
pub struct LlmQuestionGenerator {
    model: Arc<dyn LanguageModel>,
    prompt: QuestionPrompt,
    repair_attempts: u32,
}

impl LlmQuestionGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            prompt: QuestionPrompt::default(),
            repair_attempts: 0,
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: QuestionPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Number of times a malformed completion is sent back to the model for repair.
    #[must_use]
    pub fn with_repair_attempts(mut self, attempts: u32) -> Self {
        self.repair_attempts = attempts;
        self
    }

    async fn request_single(&self, request: CompletionRequest) -> Result<String, AppError> {
        self.model
            .complete(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Generation("No content found in LLM response".into()))
    }

    async fn parse_with_repair(
        &self,
        prompt_text: &str,
        mut completion: String,
    ) -> Result<QuestionList, AppError> {
        let mut remaining = self.repair_attempts;
        loop {
            match serde_json::from_str::<QuestionList>(strip_code_fence(&completion)) {
                Ok(list) => return Ok(list),
                Err(err) if remaining > 0 => {
                    remaining = remaining.saturating_sub(1);
                    warn!(error = %err, remaining, "question output malformed; asking model to repair it");
                    let repair = CompletionRequest::new(
                        OUTPUT_REPAIR_SYSTEM_MESSAGE,
                        output_repair_user_message(prompt_text, &completion),
                    );
                    completion = self.request_single(repair).await?;
                }
                Err(err) => {
                    return Err(AppError::Generation(format!(
                        "Failed to parse LLM response into questions: {err}"
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(&self, chunk: &Chunk, count: usize) -> Result<Vec<String>, AppError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let system = self.prompt.system_message();
        let user = self.prompt.user_message(&chunk.text, count);
        let prompt_text = format!("{system}\n{user}");

        let request = CompletionRequest::new(system, user).with_schema(
            "question_list",
            "Questions answerable from the supplied context",
            question_schema(),
        );

        let completion = self.request_single(request).await?;
        let list = self.parse_with_repair(&prompt_text, completion).await?;
        let raw_count = list.questions.len();
        let questions = normalize_questions(list.questions, count);

        debug!(
            chunk_key = %chunk.key(),
            requested = count,
            returned = raw_count,
            kept = questions.len(),
            "questions generated"
        );

        Ok(questions)
    }
}

/// NFKC-normalises and trims questions, dropping blanks and exact repeats,
/// and keeps at most `limit` of them.
pub fn normalize_questions(raw: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|question| question.nfkc().collect::<String>().trim().to_string())
        .filter(|question| !question.is_empty())
        .filter(|question| seen.insert(question.clone()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::llm_instructions::FewShotExample;
    use tokio::sync::Mutex;

    struct ScriptedModel {
        replies: Mutex<Vec<Result<String, AppError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String, AppError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }

        async fn request_count(&self) -> usize {
            self.requests.lock().await.len()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>, AppError> {
            self.requests.lock().await.push(request);
            let mut replies = self.replies.lock().await;
            if replies.is_empty() {
                return Err(AppError::Generation("script exhausted".into()));
            }
            replies.remove(0).map(|reply| vec![reply])
        }
    }

    fn sky_chunk() -> Chunk {
        Chunk::from_text("The sky is blue due to Rayleigh scattering.")
    }

    #[tokio::test]
    async fn returns_at_most_the_requested_questions() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(r#"```json
{"questions": ["Why is the sky blue?", "What is Rayleigh scattering?", "Is the sky ever red?"]}
```"#
            .to_string())]));
        let generator = LlmQuestionGenerator::new(model.clone());

        let questions = generator
            .generate(&sky_chunk(), 2)
            .await
            .expect("generation succeeds");

        assert_eq!(
            questions,
            vec!["Why is the sky blue?", "What is Rayleigh scattering?"]
        );
        let requests = model.requests.lock().await;
        let request = requests.first().expect("one request");
        assert!(request.schema.is_some());
        assert!(request.user.contains("Rayleigh scattering"));
    }

    #[tokio::test]
    async fn custom_prompt_examples_reach_the_model() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            r#"{"questions": ["Why is the sky blue?"]}"#.to_string(),
        )]));
        let prompt = QuestionPrompt {
            role: "You write quiz questions.".into(),
            examples: vec![FewShotExample {
                context: "Water boils at 100 degrees Celsius at sea level.".into(),
                questions: vec!["At what temperature does water boil?".into()],
            }],
            ..QuestionPrompt::default()
        };
        let generator = LlmQuestionGenerator::new(model.clone()).with_prompt(prompt);

        let questions = generator
            .generate(&sky_chunk(), 1)
            .await
            .expect("generation succeeds");

        assert_eq!(questions, vec!["Why is the sky blue?"]);
        let requests = model.requests.lock().await;
        let request = requests.first().expect("one request");
        assert!(request.system.starts_with("You write quiz questions."));
        assert!(request.user.contains("Water boils at 100 degrees Celsius"));
        assert!(request.user.contains("At what temperature does water boil?"));
        assert!(!request.user.contains("Abstractive summarization"));
    }

    #[tokio::test]
    async fn fewer_questions_than_requested_are_accepted() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            r#"{"questions": ["Why is the sky blue?", "   ", ""]}"#.to_string(),
        )]));
        let generator = LlmQuestionGenerator::new(model);

        let questions = generator.generate(&sky_chunk(), 5).await.expect("generation");

        assert_eq!(questions, vec!["Why is the sky blue?"]);
    }

    #[tokio::test]
    async fn zero_count_skips_the_model() {
        let model = Arc::new(ScriptedModel::new(Vec::new()));
        let generator = LlmQuestionGenerator::new(model.clone());

        let questions = generator.generate(&sky_chunk(), 0).await.expect("generation");

        assert!(questions.is_empty());
        assert_eq!(model.request_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_output_is_a_generation_error() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            "1. Why is the sky blue?\n2. What scatters light?".to_string(),
        )]));
        let generator = LlmQuestionGenerator::new(model.clone());

        let result = generator.generate(&sky_chunk(), 2).await;

        assert!(matches!(result, Err(AppError::Generation(_))));
        assert_eq!(model.request_count().await, 1);
    }

    #[tokio::test]
    async fn model_failure_surfaces_unchanged() {
        let model = Arc::new(ScriptedModel::new(vec![Err(AppError::Generation(
            "upstream unavailable".into(),
        ))]));
        let generator = LlmQuestionGenerator::new(model);

        let err = generator
            .generate(&sky_chunk(), 2)
            .await
            .expect_err("generation fails");

        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn repair_attempt_recovers_malformed_output() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("questions: why is the sky blue".to_string()),
            Ok(r#"{"questions": ["Why is the sky blue?"]}"#.to_string()),
        ]));
        let generator = LlmQuestionGenerator::new(model.clone()).with_repair_attempts(1);

        let questions = generator.generate(&sky_chunk(), 2).await.expect("repaired");

        assert_eq!(questions, vec!["Why is the sky blue?"]);
        let requests = model.requests.lock().await;
        let repair = requests.get(1).expect("repair request");
        assert!(repair.user.contains("questions: why is the sky blue"));
        assert!(repair.schema.is_none());
    }

    #[test]
    fn normalisation_trims_dedupes_and_limits() {
        let raw = vec![
            " What is ﬁne dust? ".to_string(),
            "What is fine dust?".to_string(),
            "Second?".to_string(),
            "Third?".to_string(),
        ];

        let questions = normalize_questions(raw, 2);

        assert_eq!(questions, vec!["What is fine dust?", "Second?"]);
    }

    #[test]
    fn scaled_budget_follows_chunk_length() {
        let budget = QuestionBudget::ScaledByLength {
            chars_per_question: 10,
            min: 1,
            max: 4,
        };

        assert_eq!(budget.for_chunk(&Chunk::new("a", "short")), 1);
        assert_eq!(budget.for_chunk(&Chunk::new("b", "x".repeat(25))), 3);
        assert_eq!(budget.for_chunk(&Chunk::new("c", "x".repeat(500))), 4);
        assert_eq!(budget.for_chunk(&Chunk::new("d", "")), 1);
        assert_eq!(QuestionBudget::Fixed(7).for_chunk(&Chunk::new("e", "")), 7);
    }

    #[test]
    fn budget_is_read_from_config() {
        let config = AppConfig {
            questions_per_chunk: 6,
            questions_chars_per_question: Some(200),
            questions_min: 2,
            ..AppConfig::default()
        };

        assert_eq!(
            QuestionBudget::from_config(&config),
            QuestionBudget::ScaledByLength {
                chars_per_question: 200,
                min: 2,
                max: 6
            }
        );
    }
}
