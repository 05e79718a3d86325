use std::sync::Arc;

use clap::Parser;
use common::utils::config::get_config;
use qbrag::{args::MatcherArgs, build_embedder, init_tracing, open_index_for_read};
use retrieval_pipeline::{MatchConfig, Matcher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = MatcherArgs::parse();
    let mut config = get_config()?;
    args.apply(&mut config);

    let openai_client = Arc::new(config.openai_client());
    let embedder = build_embedder(&config, openai_client).await?;
    let index = open_index_for_read(&config).await?;
    let matcher = Matcher::with_config(embedder, index, MatchConfig::from_app_config(&config));

    if args.context {
        let retrieved = matcher
            .retrieve_context(&args.query, config.match_top_k)
            .await?;
        if retrieved.is_empty() {
            println!("No matches");
        }
        for (rank, hit) in retrieved.iter().enumerate() {
            println!(
                "{}. [{:.4}] {} (matched: {})\n{}\n",
                rank.saturating_add(1),
                hit.score,
                hit.chunk.key(),
                hit.question,
                hit.chunk.text
            );
        }
    } else {
        let matches = matcher.match_query(&args.query, config.match_top_k).await?;
        if matches.is_empty() {
            println!("No matches");
        }
        for (rank, hit) in matches.iter().enumerate() {
            println!(
                "{}. [{:.4}] {} (matched: {})",
                rank.saturating_add(1),
                hit.score,
                hit.chunk_key,
                hit.question
            );
        }
    }

    Ok(())
}
