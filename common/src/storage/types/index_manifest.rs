use tracing::warn;

use crate::{error::AppError, stored_object};

/// Record id of the single manifest each index keeps.
pub const MANIFEST_ID: &str = "current";

stored_object!(IndexManifest, "index_manifest", {
    backend: String,
    model: Option<String>,
    dimension: usize
});

impl IndexManifest {
    pub fn new(backend: &str, model: Option<String>, dimension: usize) -> Self {
        let now = Utc::now();
        Self {
            id: MANIFEST_ID.to_string(),
            created_at: now,
            updated_at: now,
            backend: backend.to_string(),
            model,
            dimension,
        }
    }

    /// Checks that vectors produced by `other`'s embedder can be compared with
    /// the vectors this index was built from.
    ///
    /// A dimension mismatch makes similarity meaningless and is rejected. A
    /// differing backend or model only degrades match quality, so it is logged.
    pub fn check_compatible(&self, other: &IndexManifest) -> Result<(), String> {
        if self.dimension != other.dimension {
            return Err(format!(
                "index was built with {}-dimensional embeddings, got {} dimensions",
                self.dimension, other.dimension
            ));
        }

        if self.backend != other.backend || self.model != other.model {
            warn!(
                index_backend = %self.backend,
                index_model = ?self.model,
                embedder_backend = %other.backend,
                embedder_model = ?other.model,
                "embedding model differs from the one used to build the index; match quality will degrade"
            );
        }

        Ok(())
    }

    pub fn ensure_writable(&self, other: &IndexManifest) -> Result<(), AppError> {
        self.check_compatible(other).map_err(AppError::IndexWrite)
    }

    pub fn ensure_queryable(&self, other: &IndexManifest) -> Result<(), AppError> {
        self.check_compatible(other).map_err(AppError::IndexQuery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_is_rejected_for_both_phases() {
        let stored = IndexManifest::new("hashed", None, 384);
        let incoming = IndexManifest::new("hashed", None, 768);

        assert!(matches!(
            stored.ensure_writable(&incoming),
            Err(AppError::IndexWrite(_))
        ));
        assert!(matches!(
            stored.ensure_queryable(&incoming),
            Err(AppError::IndexQuery(_))
        ));
    }

    #[test]
    fn model_mismatch_with_same_dimension_is_tolerated() {
        let stored = IndexManifest::new("openai", Some("text-embedding-3-small".into()), 1536);
        let incoming = IndexManifest::new("openai", Some("text-embedding-3-large".into()), 1536);

        assert!(stored.ensure_queryable(&incoming).is_ok());
    }
}
