//! Feature-hashing embedder.

use std::hash::Hasher;

use async_trait::async_trait;
use twox_hash::XxHash64;
use unicode_segmentation::UnicodeSegmentation;

use super::Embedder;
use crate::error::ToolError;

/// Default vector width.
pub const DEFAULT_DIMENSIONS: usize = 256;

/// Signed feature hashing over lowercased Unicode words, L2-normalized.
///
/// Words are hashed with seeded XXH64, so a word maps to the same bucket on
/// every platform and toolchain.
///
/// Texts sharing vocabulary land close together, which is enough to rank
/// passages by lexical overlap with a query without any network access.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing `dimensions`-wide vectors.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Vector width.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.to_lowercase().unicode_words() {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(word.as_bytes());
            let h = hasher.finish();
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ToolError> {
        Ok(inputs.iter().map(|t| self.embed_text(t)).collect())
    }
}
