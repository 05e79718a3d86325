use common::error::AppError;
use state_machines::core::GuardError;
use tracing::{debug, instrument};

use super::{
    context::PipelineContext,
    state::{Generated, Indexed, QuestionMachine, Ready, Screened},
};

#[instrument(level = "trace", skip_all, fields(chunk_key = %ctx.chunk_key))]
pub async fn generate(
    machine: QuestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<QuestionMachine<(), Generated>, AppError> {
    let requested = ctx.pipeline_config.budget.for_chunk(ctx.chunk);
    let questions = ctx.services.generate_questions(ctx.chunk, requested).await?;

    debug!(
        chunk_key = %ctx.chunk_key,
        requested,
        question_count = questions.len(),
        "questions generated for chunk"
    );

    ctx.requested = requested;
    ctx.generated = questions.len();
    ctx.questions = questions;

    machine
        .generate()
        .map_err(|(_, guard)| map_guard_error("generate", &guard))
}

#[instrument(level = "trace", skip_all, fields(chunk_key = %ctx.chunk_key))]
pub async fn screen(
    machine: QuestionMachine<(), Generated>,
    ctx: &mut PipelineContext<'_>,
) -> Result<QuestionMachine<(), Screened>, AppError> {
    let questions = std::mem::take(&mut ctx.questions);
    let kept = ctx.services.screen_questions(ctx.chunk, questions).await?;

    debug!(
        chunk_key = %ctx.chunk_key,
        generated = ctx.generated,
        kept = kept.len(),
        "questions screened"
    );

    ctx.questions = kept;

    machine
        .screen()
        .map_err(|(_, guard)| map_guard_error("screen", &guard))
}

#[instrument(level = "trace", skip_all, fields(chunk_key = %ctx.chunk_key))]
pub async fn index(
    machine: QuestionMachine<(), Screened>,
    ctx: &mut PipelineContext<'_>,
) -> Result<QuestionMachine<(), Indexed>, AppError> {
    ctx.indexed = ctx
        .services
        .index_questions(ctx.chunk, &ctx.questions)
        .await?;

    machine
        .index()
        .map_err(|(_, guard)| map_guard_error("index", &guard))
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid question pipeline transition during {event}: {guard:?}"
    ))
}
