//! Analyzer: the single entry point of the ranking core.
//!
//! Feature Extractor → Relevance Scorer → Ranker → Subsection Refiner.
//! Embeddings are fetched up front into a `SemanticIndex`; every stage after
//! that is a pure function of its inputs, so sequential and parallel embedding
//! produce identical output.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::analysis::features::{FeatureConfig, FeatureExtractor};
use crate::analysis::keywords::{PersonaKeywordTable, PersonaProfile};
use crate::analysis::ranking::{clamp_max_sections, rank_sections, Candidate};
use crate::analysis::refiner::{RefinerConfig, SubsectionRefiner};
use crate::analysis::scoring::{RelevanceScorer, ScoringWeights, SignalMode};
use crate::analysis::semantic::SemanticIndex;
use crate::embedding::{EmbedError, Embedder};
use crate::models::persona::PersonaSpec;
use crate::models::section::{DocumentSection, RefinedSubsection, ScoredSection};

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Recovered locally: the document is skipped and the run continues.
    #[error("invalid sections for document '{document_id}': {reason}")]
    Input { document_id: String, reason: String },

    /// Recovered locally: the run continues on keyword + structural signals.
    #[error("embedding capability unavailable: {0}")]
    CapabilityUnavailable(#[from] EmbedError),

    #[error("no eligible sections across {documents} document(s)")]
    EmptyResult { documents: usize },
}

/// All tunables of the ranking core, with named defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub weights: ScoringWeights,
    pub features: FeatureConfig,
    pub refiner: RefinerConfig,
}

/// A document left out of the run, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub document_id: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RankAndRefineOutput {
    /// Ordered by importance_rank, 1..=K.
    pub scored: Vec<ScoredSection>,
    /// In rank order; a long section may contribute several entries.
    pub refined: Vec<RefinedSubsection>,
    pub signal_mode: SignalMode,
    /// Documents that contributed at least one eligible section, in input order.
    pub documents_used: Vec<String>,
    pub skipped_documents: Vec<SkippedDocument>,
}

pub struct Analyzer {
    extractor: FeatureExtractor,
    scorer: RelevanceScorer,
    refiner: SubsectionRefiner,
    embedder: Arc<dyn Embedder>,
}

impl Analyzer {
    pub fn new(
        table: Arc<PersonaKeywordTable>,
        config: AnalysisConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            extractor: FeatureExtractor::new(table, config.features),
            scorer: RelevanceScorer::new(config.weights),
            refiner: SubsectionRefiner::new(config.refiner, config.weights),
            embedder,
        }
    }

    pub fn embedder_name(&self) -> &'static str {
        self.embedder.name()
    }

    /// Ranks `sections` for `persona` and refines the top `max_sections`.
    ///
    /// Malformed documents are skipped. Only an empty eligible set is an error.
    #[instrument(
        skip_all,
        fields(run_id = %Uuid::new_v4(), sections = sections.len(), max_sections = max_sections)
    )]
    pub async fn rank_and_refine(
        &self,
        persona: &PersonaSpec,
        sections: &[DocumentSection],
        max_sections: usize,
    ) -> Result<RankAndRefineOutput, AnalysisError> {
        let k = clamp_max_sections(max_sections);

        let (eligible, documents_used, skipped_documents) = collect_eligible(sections);
        if eligible.is_empty() {
            return Err(AnalysisError::EmptyResult {
                documents: documents_used.len() + skipped_documents.len(),
            });
        }

        let profile = self.extractor.profile(persona);
        if !profile.table_matched {
            debug!("No keyword family for persona, using job-description keywords only");
        }

        let mut index = SemanticIndex::for_query(self.embedder.as_ref(), &persona.query_text()).await;
        let section_texts: Vec<String> = eligible
            .iter()
            .map(|(_, s)| self.extractor.embedding_text(s))
            .collect();
        index
            .embed_missing(self.embedder.as_ref(), &section_texts)
            .await;
        let mut signal_mode = index.mode();
        let mut scored = self.rank(&eligible, &section_texts, &profile, &index, signal_mode, k);

        let segment_texts: Vec<String> = scored
            .iter()
            .flat_map(|s| self.refiner.segment_texts(s))
            .collect();
        let segments_embedded = index
            .embed_missing(self.embedder.as_ref(), &segment_texts)
            .await;

        // A late failure degrades the whole run, ranking included.
        if !segments_embedded && signal_mode == SignalMode::Full {
            signal_mode = SignalMode::Degraded;
            scored = self.rank(&eligible, &section_texts, &profile, &index, signal_mode, k);
        }

        let refined: Vec<RefinedSubsection> = scored
            .iter()
            .flat_map(|s| self.refiner.refine(s, &profile, &index))
            .collect();

        info!(
            ranked = scored.len(),
            refined = refined.len(),
            skipped = skipped_documents.len(),
            mode = ?signal_mode,
            "Analysis complete"
        );

        Ok(RankAndRefineOutput {
            scored,
            refined,
            signal_mode,
            documents_used,
            skipped_documents,
        })
    }

    /// Extracts, scores and ranks the eligible sections against the current index.
    fn rank(
        &self,
        eligible: &Eligible<'_>,
        section_texts: &[String],
        profile: &PersonaProfile,
        index: &SemanticIndex,
        mode: SignalMode,
        k: usize,
    ) -> Vec<ScoredSection> {
        let candidates: Vec<Candidate> = eligible
            .iter()
            .zip(section_texts)
            .map(|((position, section), text)| {
                let features = self
                    .extractor
                    .extract(profile, section, index.query(), index.get(text));
                Candidate {
                    relevance_score: self.scorer.score(&features, mode),
                    section: (*section).clone(),
                    features,
                    position: *position,
                }
            })
            .collect();

        rank_sections(candidates, k)
    }
}

/// Checks one document's sections. Any error skips the whole document.
pub fn validate_document(document_id: &str, sections: &[&DocumentSection]) -> Result<(), AnalysisError> {
    let fail = |reason: &str| AnalysisError::Input {
        document_id: document_id.to_string(),
        reason: reason.to_string(),
    };

    if document_id.trim().is_empty() {
        return Err(fail("empty document id"));
    }
    if sections.is_empty() {
        return Err(fail("no sections"));
    }
    if let Some(bad) = sections.iter().find(|s| s.page_number == 0) {
        return Err(fail(&format!(
            "section {} has page number 0 (pages are 1-based)",
            bad.ordinal
        )));
    }
    if sections.iter().all(|s| s.is_blank()) {
        return Err(fail("no non-empty sections"));
    }
    Ok(())
}

type Eligible<'a> = Vec<(usize, &'a DocumentSection)>;

/// Groups by document in first-appearance order, drops invalid documents and blank sections.
fn collect_eligible(
    sections: &[DocumentSection],
) -> (Eligible<'_>, Vec<String>, Vec<SkippedDocument>) {
    let mut groups: Vec<(&str, Vec<(usize, &DocumentSection)>)> = Vec::new();
    for (position, section) in sections.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|(id, _)| *id == section.document_id.as_str())
        {
            Some((_, members)) => members.push((position, section)),
            None => groups.push((section.document_id.as_str(), vec![(position, section)])),
        }
    }

    let mut eligible = Vec::new();
    let mut used = Vec::new();
    let mut skipped = Vec::new();

    for (document_id, members) in groups {
        let refs: Vec<&DocumentSection> = members.iter().map(|(_, s)| *s).collect();
        match validate_document(document_id, &refs) {
            Ok(()) => {
                used.push(document_id.to_string());
                eligible.extend(members.into_iter().filter(|(_, s)| !s.is_blank()));
            }
            Err(e) => {
                warn!("Skipping document: {e}");
                let reason = match e {
                    AnalysisError::Input { reason, .. } => reason,
                    other => other.to_string(),
                };
                skipped.push(SkippedDocument {
                    document_id: document_id.to_string(),
                    reason,
                });
            }
        }
    }

    (eligible, used, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::analysis::keywords::KeywordFamily;
    use crate::embedding::{DisabledEmbedder, HashingEmbedder};

    /// Always fails; counts how often it was asked.
    struct FailingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EmbedError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    /// Hashes normally until `fail_from`, then fails every later call.
    struct FailsLateEmbedder {
        inner: HashingEmbedder,
        fail_from: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FailsLateEmbedder {
        fn name(&self) -> &'static str {
            "fails-late"
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.fail_from {
                return Err(EmbedError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            self.inner.embed_batch(texts).await
        }
    }

    fn section(doc: &str, ordinal: usize, title: &str, body: &str) -> DocumentSection {
        DocumentSection {
            document_id: doc.to_string(),
            page_number: (ordinal + 1) as u32,
            title: title.to_string(),
            body_text: body.to_string(),
            ordinal,
        }
    }

    fn table() -> Arc<PersonaKeywordTable> {
        Arc::new(PersonaKeywordTable::new(vec![KeywordFamily::new(
            "travel",
            &["beach", "nightlife", "hotel", "restaurant", "itinerary"],
        )]))
    }

    fn analyzer(embedder: Arc<dyn Embedder>) -> Analyzer {
        Analyzer::new(table(), AnalysisConfig::default(), embedder)
    }

    fn persona() -> PersonaSpec {
        PersonaSpec::new("Travel Planner", "Plan a 4 day beach trip for college friends")
    }

    fn corpus() -> Vec<DocumentSection> {
        vec![
            section(
                "cities.pdf",
                0,
                "History of the Region",
                "The region was settled in antiquity. Roman roads crossed it. Later kingdoms fought over its ports.",
            ),
            section(
                "coast.pdf",
                0,
                "Beaches and Nightlife",
                "The beach at Nice is lively. Nightlife clubs stay open late. \
                 Book a hotel near the beach and plan a restaurant itinerary for friends.",
            ),
            section(
                "coast.pdf",
                1,
                "Coastal Adventures",
                "Rent kayaks along the beach. Sailing trips leave every morning. Friends often share boats.",
            ),
            section("empty.pdf", 0, "Blank", "   \n  "),
            section(
                "food.pdf",
                0,
                "Local Cuisine",
                "Try the bouillabaisse in Marseille. Restaurant terraces overlook the harbor.",
            ),
        ]
    }

    fn assert_invariants(out: &RankAndRefineOutput) {
        let ranks: Vec<u32> = out.scored.iter().map(|s| s.importance_rank).collect();
        let expected: Vec<u32> = (1..=out.scored.len() as u32).collect();
        assert_eq!(ranks, expected);
        for pair in out.scored.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        for r in &out.refined {
            assert!(!r.refined_text.is_empty());
            assert!(r.compression_ratio > 0.0 && r.compression_ratio <= 1.0);
        }
    }

    #[tokio::test]
    async fn test_ranks_relevant_section_first() {
        let out = analyzer(Arc::new(HashingEmbedder::new(256, false)))
            .rank_and_refine(&persona(), &corpus(), 10)
            .await
            .unwrap();

        assert_eq!(out.signal_mode, SignalMode::Full);
        assert_eq!(out.scored[0].section.title, "Beaches and Nightlife");
        assert_invariants(&out);
    }

    #[tokio::test]
    async fn test_blank_document_skipped_without_aborting() {
        let out = analyzer(Arc::new(HashingEmbedder::new(256, false)))
            .rank_and_refine(&persona(), &corpus(), 10)
            .await
            .unwrap();

        assert_eq!(out.scored.len(), 4);
        assert!(out.scored.iter().all(|s| s.section.document_id != "empty.pdf"));
        assert_eq!(out.skipped_documents.len(), 1);
        assert_eq!(out.skipped_documents[0].document_id, "empty.pdf");
        assert_eq!(out.documents_used, vec!["cities.pdf", "coast.pdf", "food.pdf"]);
    }

    #[tokio::test]
    async fn test_k_reduced_to_eligible_count() {
        let sections: Vec<DocumentSection> = corpus().into_iter().take(3).collect();
        let out = analyzer(Arc::new(HashingEmbedder::new(256, false)))
            .rank_and_refine(&persona(), &sections, 5)
            .await
            .unwrap();
        assert_eq!(out.scored.len(), 3);
        assert_invariants(&out);
    }

    #[tokio::test]
    async fn test_truncates_to_max_sections_and_refines_only_top_k() {
        let out = analyzer(Arc::new(HashingEmbedder::new(256, false)))
            .rank_and_refine(&persona(), &corpus(), 2)
            .await
            .unwrap();
        assert_eq!(out.scored.len(), 2);
        for refined in &out.refined {
            assert!(refined.original_section_ref.importance_rank <= 2);
        }
        assert_eq!(out.refined.len(), 2);
    }

    #[tokio::test]
    async fn test_no_eligible_sections_is_empty_result() {
        let sections = vec![section("a.pdf", 0, "A", " "), section("b.pdf", 0, "B", "\n")];
        let err = analyzer(Arc::new(HashingEmbedder::default()))
            .rank_and_refine(&persona(), &sections, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyResult { documents: 2 }));
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_and_is_attempted_once() {
        let embedder = Arc::new(FailingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let out = analyzer(embedder.clone())
            .rank_and_refine(&persona(), &corpus(), 10)
            .await
            .unwrap();

        assert_eq!(out.signal_mode, SignalMode::Degraded);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert!(out.scored.iter().all(|s| s.features.semantic_score == 0.0));
        assert_eq!(out.scored[0].section.title, "Beaches and Nightlife");
        assert_invariants(&out);
    }

    #[tokio::test]
    async fn test_segment_embedding_failure_degrades_ranking_too() {
        // Call 1 embeds the query, call 2 the sections, call 3 the segments.
        let embedder = Arc::new(FailsLateEmbedder {
            inner: HashingEmbedder::new(256, false),
            fail_from: 3,
            calls: AtomicUsize::new(0),
        });
        let out = analyzer(embedder.clone())
            .rank_and_refine(&persona(), &corpus(), 10)
            .await
            .unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out.signal_mode, SignalMode::Degraded);
        assert!(out.scored.iter().all(|s| s.features.semantic_score == 0.0));

        let degraded = analyzer(Arc::new(DisabledEmbedder))
            .rank_and_refine(&persona(), &corpus(), 10)
            .await
            .unwrap();
        assert_eq!(out.scored, degraded.scored);
        assert_eq!(out.refined, degraded.refined);
        assert_invariants(&out);
    }

    #[tokio::test]
    async fn test_unknown_persona_still_scored() {
        let beekeeper = PersonaSpec::new("Beekeeper", "");
        let out = analyzer(Arc::new(HashingEmbedder::new(256, false)))
            .rank_and_refine(&beekeeper, &corpus(), 10)
            .await
            .unwrap();
        assert_eq!(out.scored.len(), 4);
        assert!(out.scored.iter().all(|s| s.features.keyword_score == 0.0));
        assert!(out.scored.iter().all(|s| s.relevance_score > 0.0));
    }

    #[tokio::test]
    async fn test_parallel_and_sequential_runs_identical() {
        let sequential = analyzer(Arc::new(HashingEmbedder::new(512, false)))
            .rank_and_refine(&persona(), &corpus(), 10)
            .await
            .unwrap();
        let parallel = analyzer(Arc::new(HashingEmbedder::new(512, true)))
            .rank_and_refine(&persona(), &corpus(), 10)
            .await
            .unwrap();

        assert_eq!(sequential.scored, parallel.scored);
        assert_eq!(sequential.refined, parallel.refined);
    }

    #[tokio::test]
    async fn test_repeated_runs_identical() {
        let analyzer = analyzer(Arc::new(DisabledEmbedder));
        let first = analyzer.rank_and_refine(&persona(), &corpus(), 10).await.unwrap();
        let second = analyzer.rank_and_refine(&persona(), &corpus(), 10).await.unwrap();
        assert_eq!(first.scored, second.scored);
        assert_eq!(first.refined, second.refined);
    }

    #[test]
    fn test_validate_rejects_page_zero() {
        let mut bad = section("a.pdf", 0, "A", "Body text.");
        bad.page_number = 0;
        let err = validate_document("a.pdf", &[&bad]).unwrap_err();
        assert!(err.to_string().contains("page number 0"));
    }

    #[test]
    fn test_validate_rejects_empty_document_id() {
        let s = section("", 0, "A", "Body text.");
        assert!(validate_document("", &[&s]).is_err());
    }

    #[test]
    fn test_malformed_document_skipped_others_kept() {
        let mut bad = section("bad.pdf", 0, "A", "Body text here.");
        bad.page_number = 0;
        let good = section("good.pdf", 0, "B", "Body text here.");
        let sections = vec![bad, good];
        let (eligible, used, skipped) = collect_eligible(&sections);
        assert_eq!(eligible.len(), 1);
        assert_eq!(used, vec!["good.pdf"]);
        assert_eq!(skipped[0].document_id, "bad.pdf");
    }
}
