//! Ranker: orders scored sections, breaks ties deterministically, truncates to top-K.
//!
//! Sort key:
//! 1. relevance_score descending
//! 2. structural_score descending (sections that look like real headings win ties)
//! 3. document_id, then ordinal, ascending
//! 4. input position ascending (total order even for duplicate ids)

use std::cmp::Ordering;

use crate::models::section::{DocumentSection, FeatureVector, ScoredSection};

/// Upper bound on K regardless of what the caller asks for.
pub const MAX_SECTIONS_LIMIT: usize = 20;

/// A section with its features and composite score, before rank assignment.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub section: DocumentSection,
    pub features: FeatureVector,
    pub relevance_score: f64,
    /// Position in the input sequence.
    pub position: usize,
}

/// Clamps a requested K into 1..=MAX_SECTIONS_LIMIT.
pub fn clamp_max_sections(requested: usize) -> usize {
    requested.clamp(1, MAX_SECTIONS_LIMIT)
}

/// Total order used by the ranker. `Less` means `a` ranks above `b`.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| {
            b.features
                .structural_score
                .total_cmp(&a.features.structural_score)
        })
        .then_with(|| a.section.document_id.cmp(&b.section.document_id))
        .then_with(|| a.section.ordinal.cmp(&b.section.ordinal))
        .then_with(|| a.position.cmp(&b.position))
}

/// Ranks eligible candidates and keeps the top `max_sections`.
///
/// Blank sections are dropped before sorting. If fewer than `max_sections`
/// remain, K shrinks to that count; the output is never padded.
pub fn rank_sections(candidates: Vec<Candidate>, max_sections: usize) -> Vec<ScoredSection> {
    let mut eligible: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| !c.section.is_blank())
        .collect();

    eligible.sort_by(compare_candidates);
    eligible.truncate(max_sections);

    eligible
        .into_iter()
        .enumerate()
        .map(|(i, c)| ScoredSection {
            section: c.section,
            features: c.features,
            relevance_score: c.relevance_score,
            importance_rank: (i + 1) as u32,
        })
        .collect()
}
