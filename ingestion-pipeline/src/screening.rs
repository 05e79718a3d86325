use std::sync::Arc;

use common::{error::AppError, storage::types::chunk::Chunk};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    llm::{CompletionRequest, LanguageModel},
    utils::{
        llm_instructions::{
            answerability_schema, answerability_user_message, ANSWERABILITY_SYSTEM_MESSAGE,
        },
        strip_code_fence,
    },
};

/// Only the label is read; the question echo and explanation are ignored.
#[derive(Debug, Clone, Deserialize)]
struct Verdict {
    relevant: u8,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VerdictPayload {
    Wrapped { verdicts: Vec<Verdict> },
    Bare(Vec<Verdict>),
}

impl VerdictPayload {
    fn into_labels(self) -> Vec<u8> {
        let verdicts = match self {
            Self::Wrapped { verdicts } | Self::Bare(verdicts) => verdicts,
        };
        verdicts.into_iter().map(|v| v.relevant).collect()
    }
}

/// Asks the model whether each question can be answered from its chunk and
/// keeps only the questions voted relevant.
pub struct AnswerabilityScreen {
    model: Arc<dyn LanguageModel>,
    votes: u8,
}

impl AnswerabilityScreen {
    pub fn new(model: Arc<dyn LanguageModel>, votes: u8) -> Self {
        Self {
            model,
            votes: votes.max(1),
        }
    }

    pub async fn screen(
        &self,
        chunk: &Chunk,
        questions: Vec<String>,
    ) -> Result<Vec<String>, AppError> {
        if questions.is_empty() {
            return Ok(questions);
        }

        let request = CompletionRequest::new(
            ANSWERABILITY_SYSTEM_MESSAGE,
            answerability_user_message(&chunk.text, &questions),
        )
        .with_schema(
            "answerability_verdicts",
            "Whether each question can be answered from the context",
            answerability_schema(),
        )
        .with_choices(self.votes);

        let completions = self.model.complete(request).await?;
        let runs = parse_runs(&completions, questions.len());
        if runs.is_empty() {
            return Err(AppError::Generation(format!(
                "No usable answerability verdicts among {} completion(s)",
                completions.len()
            )));
        }

        let labels = majority_vote(&runs);
        let before = questions.len();
        let kept: Vec<String> = questions
            .into_iter()
            .zip(labels)
            .filter_map(|(question, label)| (label == 1).then_some(question))
            .collect();

        debug!(
            chunk_key = %chunk.key(),
            runs = runs.len(),
            before,
            kept = kept.len(),
            "answerability screening finished"
        );

        Ok(kept)
    }
}

fn parse_runs(completions: &[String], expected: usize) -> Vec<Vec<u8>> {
    completions
        .iter()
        .filter_map(|completion| {
            match serde_json::from_str::<VerdictPayload>(strip_code_fence(completion)) {
                Ok(payload) => {
                    let labels = payload.into_labels();
                    if labels.len() == expected {
                        Some(labels)
                    } else {
                        warn!(
                            expected,
                            got = labels.len(),
                            "dropping answerability run with wrong verdict count"
                        );
                        None
                    }
                }
                Err(err) => {
                    warn!(error = %err, "dropping unparseable answerability run");
                    None
                }
            }
        })
        .collect()
}

/// Combines per-position labels from several runs. Ties go to the label that
/// appeared first at that position.
pub fn majority_vote(runs: &[Vec<u8>]) -> Vec<u8> {
    let Some(width) = runs.first().map(Vec::len) else {
        return Vec::new();
    };

    (0..width)
        .map(|position| {
            let column: Vec<u8> = runs
                .iter()
                .filter_map(|run| run.get(position).copied())
                .collect();
            let mut best: Option<(u8, usize)> = None;
            for label in &column {
                let count = column.iter().filter(|other| *other == label).count();
                if best.is_none_or(|(_, best_count)| count > best_count) {
                    best = Some((*label, count));
                }
            }
            best.map_or(0, |(label, _)| label)
        })
        .collect()
}
