//! Local feature-hashing embedder.
//!
//! Content tokens (stop words removed) and adjacent-token bigrams are hashed with
//! CRC32 into a fixed number of buckets; one hash bit picks the sign. The result is
//! L2-normalised. No model download, no network, identical output on every run.

use async_trait::async_trait;
use rayon::prelude::*;

use crate::analysis::keywords::tokenize;
use crate::embedding::{EmbedError, Embedder};

pub const DEFAULT_DIMENSIONS: usize = 512;

/// Bigrams count for less than unigrams so shared vocabulary still dominates.
const BIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    parallel: bool,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize, parallel: bool) -> Self {
        Self {
            dimensions: dimensions.max(1),
            parallel,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embeds one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0_f32; self.dimensions];

        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, &bigram, BIGRAM_WEIGHT);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    /// Embeds a batch in input order. The parallel path collects in order too,
    /// so both paths return identical output.
    pub fn embed_all(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if self.parallel {
            texts.par_iter().map(|t| self.embed_text(t)).collect()
        } else {
            texts.iter().map(|t| self.embed_text(t)).collect()
        }
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = crc32fast::hash(feature.as_bytes());
        let bucket = (hash as usize) % self.dimensions;
        let sign = if hash & 0x8000_0000 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS, true)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &'static str {
        "hashing"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let embedder = self.clone();
        let texts = texts.to_vec();
        // CPU-bound: keep it off the async workers.
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_all(&texts)).await?;
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_vector_has_configured_dimensions() {
        let embedder = HashingEmbedder::new(64, false);
        assert_eq!(embedder.embed_text("coastal hotels and beaches").len(), 64);
    }

    #[test]
    fn test_vector_is_unit_length() {
        let v = HashingEmbedder::default().embed_text("nightlife in Nice and Marseille");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_stop_word_only_text_is_zero_vector() {
        let v = HashingEmbedder::default().embed_text("the and of it");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_related_text_is_closer_than_unrelated() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_text("plan coastal trip beaches hotels");
        let related = embedder.embed_text("The best beaches and coastal hotels for your trip");
        let unrelated = embedder.embed_text("Quarterly revenue grew on strong semiconductor demand");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let texts: Vec<String> = (0..40)
            .map(|i| format!("section {i} about methodology datasets and results {}", i * 7))
            .collect();
        let sequential = HashingEmbedder::new(128, false)
            .embed_batch(&texts)
            .await
            .unwrap();
        let parallel = HashingEmbedder::new(128, true)
            .embed_batch(&texts)
            .await
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[tokio::test]
    async fn test_batch_runs_on_blocking_pool_and_matches_direct_call() {
        let embedder = HashingEmbedder::new(64, true);
        let texts = vec!["beach hotels".to_string(), "harbor restaurants".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch, embedder.embed_all(&texts));
        assert_eq!(batch[1], embedder.embed_text("harbor restaurants"));
    }

    #[test]
    fn test_zero_dimensions_clamped_to_one() {
        assert_eq!(HashingEmbedder::new(0, false).dimensions(), 1);
    }
}
