use std::sync::Arc;

use clap::Parser;
use common::utils::config::get_config;
use ingestion_pipeline::{Corpus, IngestionPipeline, OpenAiLanguageModel};
use qbrag::{args::IndexerArgs, build_embedder, init_tracing, open_index_for_write};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = IndexerArgs::parse();
    let mut config = get_config()?;
    args.apply(&mut config);

    let openai_client = Arc::new(config.openai_client());
    let embedder = build_embedder(&config, Arc::clone(&openai_client)).await?;
    let index = open_index_for_write(&config, embedder.dimension()).await?;
    let model = Arc::new(OpenAiLanguageModel::new(
        openai_client,
        config.generation_model.clone(),
    ));

    let corpus = Corpus::load(&args.corpus).await?;
    info!(
        corpus = %args.corpus.display(),
        chunk_count = corpus.len(),
        model = %config.generation_model,
        embedding_backend = embedder.backend_label(),
        "starting offline indexing"
    );

    let pipeline = IngestionPipeline::new(model, embedder, index, &config);
    let reports = pipeline.ingest_corpus(&corpus).await?;

    let questions: usize = reports.iter().map(|report| report.indexed).sum();
    println!(
        "Indexed {questions} questions for {} chunks",
        reports.len()
    );

    Ok(())
}
