use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use common::error::AppError;
use tracing::debug;

/// JSON schema the completion is asked to conform to.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub schema: Option<ResponseSchema>,
    /// Number of independent completions to sample.
    pub choices: u8,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            schema: None,
            choices: 1,
        }
    }

    pub fn with_schema(mut self, name: &str, description: &str, schema: serde_json::Value) -> Self {
        self.schema = Some(ResponseSchema {
            name: name.to_string(),
            description: description.to_string(),
            schema,
        });
        self
    }

    pub fn with_choices(mut self, choices: u8) -> Self {
        self.choices = choices.max(1);
        self
    }
}

/// External text generation capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns one completion text per sampled choice.
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>, AppError>;
}

/// Chat completions against an OpenAI-compatible endpoint.
pub struct OpenAiLanguageModel {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiLanguageModel {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiLanguageModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>, AppError> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(request.system.as_str()).into(),
                ChatCompletionRequestUserMessage::from(request.user).into(),
            ])
            .n(request.choices);

        if let Some(schema) = request.schema {
            builder.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some(schema.description),
                    name: schema.name,
                    schema: Some(schema.schema),
                    strict: Some(true),
                },
            });
        }

        let chat_request = builder
            .build()
            .map_err(|e| AppError::Generation(format!("invalid completion request: {e}")))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| AppError::Generation(format!("completion request failed: {e}")))?;

        let contents: Vec<String> = response
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .collect();

        if contents.is_empty() {
            return Err(AppError::Generation(
                "No content found in LLM response".into(),
            ));
        }

        debug!(
            model = %self.model,
            choices = contents.len(),
            "completion received"
        );

        Ok(contents)
    }
}
