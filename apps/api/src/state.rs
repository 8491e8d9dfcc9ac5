use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::analysis::keywords::PersonaKeywordTable;
use crate::analysis::pipeline::{AnalysisConfig, Analyzer};
use crate::config::{Config, EmbeddingBackend, EmbeddingConfig};
use crate::embedding::hashing::DEFAULT_DIMENSIONS;
use crate::embedding::{DisabledEmbedder, Embedder, HashingEmbedder, RemoteEmbedder};
use crate::ingest::{HeuristicSegmenter, Segmenter};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Ranking core. Holds the embedding backend chosen at startup.
    pub analyzer: Arc<Analyzer>,
    /// Pluggable segmenter. Default: HeuristicSegmenter.
    pub segmenter: Arc<dyn Segmenter>,
}

impl AppState {
    /// Wires the analyzer and segmenter from config. Rejects invalid scoring weights.
    pub fn from_config(config: Config) -> Result<Self> {
        let mut analysis = AnalysisConfig::default();
        analysis.refiner.max_refined_chars = config.refined_text_max_chars;
        analysis
            .weights
            .validate()
            .map_err(|e| anyhow!("Invalid scoring weights: {e}"))?;

        let table = PersonaKeywordTable::default();
        if table.is_empty() {
            warn!("Persona keyword table is empty, keyword signal will use job descriptions only");
        } else {
            info!(families = table.len(), "Persona keyword table loaded");
        }

        let embedder = build_embedder(&config.embedding)?;
        let analyzer = Analyzer::new(Arc::new(table), analysis, embedder);
        let segmenter =
            HeuristicSegmenter::new().context("Failed to compile segmenter patterns")?;

        Ok(Self {
            config,
            analyzer: Arc::new(analyzer),
            segmenter: Arc::new(segmenter),
        })
    }
}

fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::Hashing => {
            let hashing = HashingEmbedder::new(DEFAULT_DIMENSIONS, config.parallel);
            info!(dimensions = hashing.dimensions(), "Local hashing embedder configured");
            Arc::new(hashing)
        }
        EmbeddingBackend::Remote => {
            let base_url = config
                .api_url
                .as_deref()
                .context("EMBEDDING_API_URL is required for the remote backend")?;
            let remote = RemoteEmbedder::new(
                base_url,
                config.api_key.clone(),
                config.model.clone(),
                Duration::from_secs(config.timeout_secs),
            )
            .context("Failed to build remote embedding client")?;
            info!(endpoint = remote.endpoint(), model = %config.model, "Remote embedder configured");
            Arc::new(remote)
        }
        EmbeddingBackend::None => Arc::new(DisabledEmbedder),
    };
    Ok(embedder)
}
