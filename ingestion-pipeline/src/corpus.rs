use std::path::Path;

use common::{error::AppError, storage::types::chunk::Chunk};
use serde::Deserialize;
use tracing::debug;

/// One line of a JSON-lines corpus file.
#[derive(Debug, Deserialize)]
struct CorpusRecord {
    #[serde(default)]
    key: Option<String>,
    text: String,
}

/// Ordered set of chunks fed to the offline phase.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chunks: Vec<Chunk>,
}

impl Corpus {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// Builds a corpus whose chunk keys are derived from each text.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(Chunk::from_text).collect())
    }

    /// Parses `{"key": "...", "text": "..."}` records, one per line. Blank
    /// lines are skipped and a missing key is derived from the text.
    pub fn parse_jsonl(input: &str) -> Result<Self, AppError> {
        let mut chunks = Vec::new();
        for (line_no, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record: CorpusRecord = serde_json::from_str(line).map_err(|err| {
                AppError::Validation(format!("corpus line {}: {err}", line_no + 1))
            })?;
            if record.text.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "corpus line {}: text is empty",
                    line_no + 1
                )));
            }

            let chunk = match record.key {
                Some(key) if !key.trim().is_empty() => Chunk::new(key, record.text),
                _ => Chunk::from_text(record.text),
            };
            chunks.push(chunk);
        }
        Ok(Self::new(chunks))
    }

    /// Splits plain text into chunks on blank lines.
    pub fn parse_plain_text(input: &str) -> Self {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in input.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    chunks.push(current.join("\n"));
                    current.clear();
                }
            } else {
                current.push(line.trim_end());
            }
        }
        if !current.is_empty() {
            chunks.push(current.join("\n"));
        }
        Self::from_texts(chunks)
    }

    /// Reads a corpus file; `.jsonl` files are parsed as records, anything
    /// else as blank-line separated plain text.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let input = tokio::fs::read_to_string(path).await?;
        let is_jsonl = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));

        let corpus = if is_jsonl {
            Self::parse_jsonl(&input)?
        } else {
            Self::parse_plain_text(&input)
        };

        debug!(
            path = %path.display(),
            chunk_count = corpus.len(),
            jsonl = is_jsonl,
            "corpus loaded"
        );
        Ok(corpus)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
