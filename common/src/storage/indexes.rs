use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::{error::AppError, storage::db::SurrealDbClient};

/// Candidate list size used by the HNSW index during search.
pub const HNSW_SEARCH_EF: usize = 40;

#[derive(Clone, Copy)]
struct HnswIndexSpec {
    index_name: &'static str,
    table: &'static str,
    options: &'static str,
}

impl HnswIndexSpec {
    fn definition_if_not_exists(&self, dimension: usize) -> String {
        format!(
            "DEFINE INDEX IF NOT EXISTS {index} ON TABLE {table} \
             FIELDS embedding HNSW DIMENSION {dimension} {options};",
            index = self.index_name,
            table = self.table,
            options = self.options,
        )
    }

    fn definition_overwrite(&self, dimension: usize) -> String {
        format!(
            "DEFINE INDEX OVERWRITE {index} ON TABLE {table} \
             FIELDS embedding HNSW DIMENSION {dimension} {options};",
            index = self.index_name,
            table = self.table,
            options = self.options,
        )
    }
}

const QUESTION_INDEX: HnswIndexSpec = HnswIndexSpec {
    index_name: "idx_embedding_question_entry",
    table: "question_entry",
    options: "DIST COSINE",
};

/// Defines the HNSW index over question embeddings for `dimension`.
/// Idempotent; an index built for another dimension is overwritten.
pub async fn ensure_question_index(db: &SurrealDbClient, dimension: usize) -> Result<(), AppError> {
    ensure_hnsw_index(db, &QUESTION_INDEX, dimension)
        .await
        .map_err(AppError::index_write)
}

async fn ensure_hnsw_index(
    db: &SurrealDbClient,
    spec: &HnswIndexSpec,
    dimension: usize,
) -> Result<()> {
    let definition = match hnsw_index_state(db, spec, dimension).await? {
        HnswIndexState::Missing | HnswIndexState::Matches => {
            spec.definition_if_not_exists(dimension)
        }
        HnswIndexState::Different(existing) => {
            info!(
                index = spec.index_name,
                table = spec.table,
                existing_dimension = existing,
                target_dimension = dimension,
                "Overwriting HNSW index to match new embedding dimension"
            );
            spec.definition_overwrite(dimension)
        }
    };

    let res = db
        .client
        .query(definition)
        .await
        .with_context(|| format!("creating index {} on {}", spec.index_name, spec.table))?;
    res.check()
        .with_context(|| format!("index definition failed for {}", spec.index_name))?;

    Ok(())
}

enum HnswIndexState {
    Missing,
    Matches,
    Different(u64),
}

async fn hnsw_index_state(
    db: &SurrealDbClient,
    spec: &HnswIndexSpec,
    expected_dimension: usize,
) -> Result<HnswIndexState> {
    let info_query = format!("INFO FOR TABLE {table};", table = spec.table);
    let mut response = db
        .client
        .query(info_query)
        .await
        .with_context(|| format!("fetching table info for {}", spec.table))?;

    let info: surrealdb::Value = response
        .take(0)
        .context("failed to take table info response")?;

    let info_json: Value =
        serde_json::to_value(info).context("serializing table info to JSON for parsing")?;

    let Some(definition) = info_json
        .get("Object")
        .and_then(|o| o.get("indexes"))
        .and_then(|i| i.get("Object"))
        .and_then(|i| i.get(spec.index_name))
        .and_then(|details| details.get("Strand"))
        .and_then(Value::as_str)
    else {
        return Ok(HnswIndexState::Missing);
    };

    match extract_dimension(definition) {
        None => Ok(HnswIndexState::Missing),
        Some(current) if current == expected_dimension as u64 => Ok(HnswIndexState::Matches),
        Some(current) => Ok(HnswIndexState::Different(current)),
    }
}

fn extract_dimension(definition: &str) -> Option<u64> {
    definition
        .split("DIMENSION")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|token| token.trim_end_matches(';').parse::<u64>().ok())
}
