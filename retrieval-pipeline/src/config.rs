use common::utils::config::{AppConfig, DuplicatePolicy};

/// Command line spelling of [`DuplicatePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Default)]
pub enum DuplicateMode {
    /// Every matched question is returned, chunks may repeat
    #[default]
    KeepAll,
    /// Only the best matched question per chunk is returned
    BestPerChunk,
}

impl From<DuplicateMode> for DuplicatePolicy {
    fn from(mode: DuplicateMode) -> Self {
        match mode {
            DuplicateMode::KeepAll => Self::KeepAll,
            DuplicateMode::BestPerChunk => Self::BestPerChunk,
        }
    }
}

/// Tunable parameters of a match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    pub duplicate_policy: DuplicatePolicy,
    /// Over-fetch factor applied to `k` before de-duplicating per chunk.
    pub candidate_multiplier: usize,
    pub score_threshold: Option<f32>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::KeepAll,
            candidate_multiplier: 4,
            score_threshold: None,
        }
    }
}

impl MatchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            duplicate_policy: config.match_duplicate_policy,
            candidate_multiplier: config.match_candidate_multiplier.max(1),
            score_threshold: config.match_score_threshold,
        }
    }

    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Number of index entries to request for a result count of `k`.
    pub fn candidates_for(&self, k: usize) -> usize {
        match self.duplicate_policy {
            DuplicatePolicy::KeepAll => k,
            DuplicatePolicy::BestPerChunk => k.saturating_mul(self.candidate_multiplier.max(1)),
        }
    }
}
