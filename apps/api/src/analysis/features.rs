//! Feature Extractor: computes the independent relevance signals for each section.
//!
//! - semantic: rescaled cosine between the persona/job embedding and the section embedding
//! - keyword: distinct persona keyword hits, saturating
//! - structural: heading/position/length heuristics, each adding a fixed increment
//!
//! All three land in [0, 1]. Blank sections get an all-zero vector.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::keywords::{PersonaKeywordTable, PersonaProfile};
use crate::embedding::Embedding;
use crate::models::persona::PersonaSpec;
use crate::models::section::{DocumentSection, FeatureVector};

/// Heading substrings that usually mark a section worth reading.
pub const IMPORTANT_HEADING_PATTERNS: &[&str] = &[
    "abstract",
    "introduction",
    "overview",
    "summary",
    "method",
    "results",
    "discussion",
    "conclusion",
    "findings",
    "analysis",
    "recommendation",
    "guide",
    "tips",
    "key",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralHeuristics {
    pub heading_present: f64,
    pub important_heading: f64,
    pub early_position: f64,
    pub plausible_length: f64,
    /// Ordinals strictly below this count as "early in the document".
    pub early_ordinal_limit: usize,
    pub min_body_chars: usize,
    pub max_body_chars: usize,
    pub important_patterns: Vec<String>,
}

impl Default for StructuralHeuristics {
    fn default() -> Self {
        Self {
            heading_present: 0.3,
            important_heading: 0.3,
            early_position: 0.2,
            plausible_length: 0.2,
            early_ordinal_limit: 3,
            min_body_chars: 100,
            max_body_chars: 4000,
            important_patterns: IMPORTANT_HEADING_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Distinct keyword hits at which the keyword score reaches 1.0.
    pub keyword_saturation: f64,
    /// Whitespace tokens of title + body sent to the embedder.
    pub embedding_token_budget: usize,
    pub structural: StructuralHeuristics,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            keyword_saturation: 5.0,
            embedding_token_budget: 256,
            structural: StructuralHeuristics::default(),
        }
    }
}

/// Computes `FeatureVector`s against one keyword table. Holds no per-run state.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    table: Arc<PersonaKeywordTable>,
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(table: Arc<PersonaKeywordTable>, config: FeatureConfig) -> Self {
        Self { table, config }
    }

    /// Derives the run's keyword set. Call once per run and reuse.
    pub fn profile(&self, persona: &PersonaSpec) -> PersonaProfile {
        PersonaProfile::build(persona, &self.table)
    }

    /// Title plus leading body text, truncated to the embedding token budget.
    pub fn embedding_text(&self, section: &DocumentSection) -> String {
        section
            .title
            .split_whitespace()
            .chain(section.body_text.split_whitespace())
            .take(self.config.embedding_token_budget)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Distinct keyword hits divided by the saturation constant, capped at 1.0.
    pub fn keyword_score(&self, profile: &PersonaProfile, text: &str) -> f64 {
        keyword_score_with(profile, text, self.config.keyword_saturation)
    }

    pub fn structural_score(&self, section: &DocumentSection) -> f64 {
        let h = &self.config.structural;
        let title = section.title.trim();
        let mut score = 0.0;

        if !title.is_empty() {
            score += h.heading_present;

            let title_lower = title.to_lowercase();
            if h
                .important_patterns
                .iter()
                .any(|p| title_lower.contains(&p.to_lowercase()))
            {
                score += h.important_heading;
            }
        }

        if section.ordinal < h.early_ordinal_limit {
            score += h.early_position;
        }

        let body_chars = section.body_text.trim().chars().count();
        if (h.min_body_chars..=h.max_body_chars).contains(&body_chars) {
            score += h.plausible_length;
        }

        f64::min(score, 1.0)
    }

    /// Full feature vector for one section. `query` is the persona/job embedding.
    pub fn extract(
        &self,
        profile: &PersonaProfile,
        section: &DocumentSection,
        query: &Embedding,
        section_embedding: &Embedding,
    ) -> FeatureVector {
        if section.is_blank() {
            return FeatureVector::zero();
        }

        let text = format!("{} {}", section.title, section.body_text);
        FeatureVector {
            semantic_score: query.similarity(section_embedding).unwrap_or(0.0),
            keyword_score: self.keyword_score(profile, &text),
            structural_score: self.structural_score(section),
        }
    }
}

/// Shared with the refiner, which uses its own saturation at sentence granularity.
pub fn keyword_score_with(profile: &PersonaProfile, text: &str, saturation: f64) -> f64 {
    if saturation <= 0.0 {
        return 0.0;
    }
    (profile.count_hits(text) as f64 / saturation).min(1.0)
}
