//! Per-run cache of embeddings, keyed by the exact text that was embedded.
//!
//! Built by the pipeline before the pure scoring stages run, so scoring never
//! awaits and never sees an error: a missing or failed vector is `Unavailable`.

use std::collections::HashMap;

use tracing::warn;

use crate::analysis::pipeline::AnalysisError;
use crate::analysis::scoring::SignalMode;
use crate::embedding::{Embedder, Embedding};

static UNAVAILABLE: Embedding = Embedding::Unavailable;

#[derive(Debug, Clone)]
pub struct SemanticIndex {
    query: Embedding,
    vectors: HashMap<String, Embedding>,
}

impl SemanticIndex {
    /// An index with no query vector; every lookup is unavailable.
    pub fn unavailable() -> Self {
        Self {
            query: Embedding::Unavailable,
            vectors: HashMap::new(),
        }
    }

    pub fn with_query(query: Vec<f32>) -> Self {
        Self {
            query: Embedding::Vector(query),
            vectors: HashMap::new(),
        }
    }

    /// Full when the persona/job query has a vector.
    pub fn mode(&self) -> SignalMode {
        if self.query.is_available() {
            SignalMode::Full
        } else {
            SignalMode::Degraded
        }
    }

    pub fn query(&self) -> &Embedding {
        &self.query
    }

    pub fn get(&self, text: &str) -> &Embedding {
        self.vectors.get(text).unwrap_or(&UNAVAILABLE)
    }

    /// Rescaled similarity between the query and `text`, if both have vectors.
    pub fn similarity(&self, text: &str) -> Option<f64> {
        self.query.similarity(self.get(text))
    }

    pub fn insert(&mut self, text: String, vector: Vec<f32>) {
        self.vectors.insert(text, Embedding::Vector(vector));
    }

    /// Drops the query vector, switching the rest of the run to degraded scoring.
    pub fn degrade(&mut self) {
        self.query = Embedding::Unavailable;
        self.vectors.clear();
    }

    /// Embeds the persona/job query. Failure yields a degraded index and one warning.
    pub async fn for_query(embedder: &dyn Embedder, query_text: &str) -> Self {
        match embedder.embed(query_text).await {
            Ok(vector) => Self::with_query(vector),
            Err(e) => {
                let err = AnalysisError::from(e);
                warn!(backend = embedder.name(), "{err}, using keyword + structural scoring");
                Self::unavailable()
            }
        }
    }

    /// Embeds every text not already cached, in one batch call.
    ///
    /// Returns `false` if the batch failed; the index is then degraded and the
    /// caller should not log again.
    pub async fn embed_missing(&mut self, embedder: &dyn Embedder, texts: &[String]) -> bool {
        if self.mode() == SignalMode::Degraded {
            return false;
        }

        let mut missing: Vec<String> = texts
            .iter()
            .filter(|t| !self.vectors.contains_key(t.as_str()))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();

        if missing.is_empty() {
            return true;
        }

        match embedder.embed_batch(&missing).await {
            Ok(vectors) if vectors.len() == missing.len() => {
                for (text, vector) in missing.into_iter().zip(vectors) {
                    self.insert(text, vector);
                }
                true
            }
            Ok(vectors) => {
                warn!(
                    backend = embedder.name(),
                    "Embedding backend returned {} vectors for {} inputs, using keyword + structural scoring",
                    vectors.len(),
                    missing.len()
                );
                self.degrade();
                false
            }
            Err(e) => {
                let err = AnalysisError::from(e);
                warn!(backend = embedder.name(), "{err}, using keyword + structural scoring");
                self.degrade();
                false
            }
        }
    }
}
