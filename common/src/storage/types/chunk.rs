use sha2::{Digest, Sha256};

use crate::stored_object;

stored_object!(Chunk, "chunk", {
    /// The source content this chunk carries
    text: String
});

/// Number of digest bytes kept when a key is derived from the chunk text.
const DERIVED_KEY_BYTES: usize = 16;

impl Chunk {
    /// Creates a chunk under a caller supplied key.
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: key.into(),
            created_at: now,
            updated_at: now,
            text: text.into(),
        }
    }

    /// Creates a chunk whose key is derived from its text, so the same content
    /// always lands under the same key.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let key = Self::derive_key(&text);
        Self::new(key, text)
    }

    pub fn derive_key(text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        digest
            .iter()
            .take(DERIVED_KEY_BYTES)
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    pub fn key(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_keys_are_stable_and_content_addressed() {
        let first = Chunk::from_text("The sky is blue due to Rayleigh scattering.");
        let second = Chunk::from_text("The sky is blue due to Rayleigh scattering.");
        let other = Chunk::from_text("Grass is green because of chlorophyll.");

        assert_eq!(first.key(), second.key());
        assert_ne!(first.key(), other.key());
        assert_eq!(first.key().len(), DERIVED_KEY_BYTES * 2);
    }

    #[test]
    fn explicit_keys_are_kept() {
        let chunk = Chunk::new("doc-1#0", "Some content");
        assert_eq!(chunk.key(), "doc-1#0");
        assert_eq!(chunk.text, "Some content");
    }
}
