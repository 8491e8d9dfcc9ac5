//! Embedding capability: pluggable, trait-based `embed(text) -> vector`.
//!
//! Default: `HashingEmbedder` (local, deterministic, no network).
//! Optional: `RemoteEmbedder` (OpenAI-compatible `/embeddings` endpoint).
//! `DisabledEmbedder` always reports the capability as unavailable.
//!
//! The analyzer holds an `Arc<dyn Embedder>`, chosen at startup via config.
//! Failures never propagate past the analyzer: they become `Embedding::Unavailable`
//! and the run falls back to keyword + structural scoring.

use async_trait::async_trait;
use thiserror::Error;

pub mod hashing;
pub mod remote;

pub use hashing::HashingEmbedder;
pub use remote::RemoteEmbedder;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding capability disabled")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("embedding backend returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("embedding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// ────────────────────────────────────────────────────────────────────────────
// Capability result
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of asking the capability for a vector. Keeps the fallback explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    Vector(Vec<f32>),
    Unavailable,
}

impl Embedding {
    pub fn is_available(&self) -> bool {
        matches!(self, Embedding::Vector(_))
    }

    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Embedding::Vector(v) => Some(v),
            Embedding::Unavailable => None,
        }
    }

    /// Cosine similarity rescaled from [-1, 1] to [0, 1], or `None` if either side is unavailable.
    pub fn similarity(&self, other: &Embedding) -> Option<f64> {
        let (a, b) = (self.as_vector()?, other.as_vector()?);
        Some(rescale_cosine(cosine_similarity(a, b)))
    }
}

/// Cosine similarity. Zero-norm vectors and dimension mismatches count as orthogonal (0.0).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Linear map [-1, 1] → [0, 1].
pub fn rescale_cosine(cosine: f64) -> f64 {
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The embedding trait. Implement this to swap backends without touching the analyzer.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short backend label for logs.
    fn name(&self) -> &'static str;

    /// Embeds every input, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbedError::CountMismatch {
                expected: 1,
                got: vectors.len(),
            });
        }
        Ok(vectors.remove(0))
    }
}

/// Backend that is never available. Forces keyword + structural scoring.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::Disabled)
    }
}
