//! Embedding provider abstraction.
//!
//! The indexer only needs three things from an embedding model: a vector
//! per chunk, the model name (stamped on every content point) and the vector
//! dimensionality (used for the zero vectors of visibility points and for
//! collection creation).
//!
//! [`HashEmbedder`] is a dependency-free provider based on feature hashing.
//! It is deterministic and good enough for lexical similarity, which makes it
//! the default for the CLI and for tests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::BdxError;

// ============================================================================
// ModelInfo
// ============================================================================

/// Static description of an embedding model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Model identifier.
    pub model: String,
    /// Output vector dimension.
    pub dimensions: usize,
}

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, BdxError>;

    /// Identifier of the model currently in use.
    fn current_model(&self) -> &str;

    /// Model description, including its dimensionality.
    fn model_info(&self) -> ModelInfo;

    /// Embed several texts; the default calls [`embed`](Self::embed) in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BdxError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

// ============================================================================
// HashEmbedder
// ============================================================================

/// Model id reported by [`HashEmbedder`].
pub const HASH_EMBEDDER_MODEL: &str = "bdx-hash-v1";

/// Feature-hashing embedder.
///
/// Lower-cased alphanumeric tokens are hashed into `dimension` buckets with a
/// sign bit, then the vector is L2-normalised.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create an embedder producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, BdxError> {
        let mut vector = vec![0.0f32; self.dimension];

        let tokens = text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn current_model(&self) -> &str {
        HASH_EMBEDDER_MODEL
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model: HASH_EMBEDDER_MODEL.to_string(),
            dimensions: self.dimension,
        }
    }
}
