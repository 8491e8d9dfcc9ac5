//! Subsection Refiner: condenses each ranked section into its most salient sentences.
//!
//! Algorithm, per section (or per window of a long section):
//! 1. Split the body into sentence-like segments on `.`, `!`, `?` and blank lines
//! 2. Score each segment with the semantic + keyword signals (no structural signal)
//! 3. Greedily take the best segments that fit the character budget
//! 4. Re-join them in their original order
//!
//! compression_ratio = refined chars / original chars, always in (0, 1].

use serde::{Deserialize, Serialize};

use crate::analysis::features::keyword_score_with;
use crate::analysis::keywords::PersonaProfile;
use crate::analysis::scoring::{ScoringWeights, SignalMode};
use crate::analysis::semantic::SemanticIndex;
use crate::models::section::{RefinedSubsection, ScoredSection, SectionRef};

const ELLIPSIS: &str = "...";
const UNTITLED: &str = "Untitled section";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinerConfig {
    /// Character budget for one refined text.
    pub max_refined_chars: usize,
    pub max_segments: usize,
    /// Shorter segments are ignored unless nothing else is left.
    pub min_segment_chars: usize,
    pub sentence_keyword_saturation: f64,
    /// Bodies longer than this are refined in consecutive windows.
    pub split_threshold_chars: usize,
    pub max_parts_per_section: usize,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            max_refined_chars: 500,
            max_segments: 5,
            min_segment_chars: 10,
            sentence_keyword_saturation: 3.0,
            split_threshold_chars: 3000,
            max_parts_per_section: 3,
        }
    }
}

/// Splits text into whitespace-normalised sentence-like segments.
///
/// A boundary follows a run of `.`, `!` or `?` when the next character is
/// whitespace or the end of input, and at every blank line.
pub fn split_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    let mut newlines = 0;

    while let Some(c) = chars.next() {
        if c == '\n' {
            newlines += 1;
            if newlines >= 2 {
                flush_segment(&mut current, &mut segments);
            }
            current.push(' ');
            continue;
        }
        if !c.is_whitespace() {
            newlines = 0;
        }
        current.push(c);

        if matches!(c, '.' | '!' | '?') {
            while let Some(&next) = chars.peek() {
                if !matches!(next, '.' | '!' | '?') {
                    break;
                }
                current.push(next);
                chars.next();
            }
            if chars.peek().map_or(true, |n| n.is_whitespace()) {
                flush_segment(&mut current, &mut segments);
            }
        }
    }
    flush_segment(&mut current, &mut segments);

    segments
}

fn flush_segment(current: &mut String, segments: &mut Vec<String>) {
    let normalized = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() {
        segments.push(normalized);
    }
    current.clear();
}

/// Cuts `text` to at most `max_chars` characters, preferring a word boundary, and appends "...".
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let head: String = text.chars().take(keep).collect();
    let cut = match head.rfind(' ') {
        Some(pos) if head[..pos].chars().count() * 5 > keep * 4 => head[..pos].to_string(),
        _ => head,
    };
    format!("{}{ELLIPSIS}", cut.trim_end())
}

/// One window of a section body, already split into segments.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementPart {
    pub segments: Vec<String>,
    pub original_chars: usize,
}

#[derive(Debug, Clone)]
pub struct SubsectionRefiner {
    config: RefinerConfig,
    weights: ScoringWeights,
}

impl SubsectionRefiner {
    pub fn new(config: RefinerConfig, weights: ScoringWeights) -> Self {
        Self { config, weights }
    }

    /// Splits a body into one part, or several windows when it is longer than the threshold.
    pub fn partition(&self, body: &str) -> Vec<RefinementPart> {
        let segments = split_segments(body);
        let body_chars = body.chars().count();

        if body_chars <= self.config.split_threshold_chars || segments.len() < 2 {
            return vec![RefinementPart {
                segments,
                original_chars: body_chars,
            }];
        }

        let mut parts: Vec<RefinementPart> = Vec::new();
        let mut window: Vec<String> = Vec::new();
        let mut window_chars = 0usize;

        for segment in segments {
            let len = segment.chars().count();
            let added = if window.is_empty() { len } else { len + 1 };
            if !window.is_empty() && window_chars + added > self.config.split_threshold_chars {
                parts.push(RefinementPart {
                    segments: std::mem::take(&mut window),
                    original_chars: window_chars,
                });
                window_chars = 0;
                if parts.len() == self.config.max_parts_per_section {
                    return parts;
                }
            }
            window_chars += if window.is_empty() { len } else { len + 1 };
            window.push(segment);
        }
        if !window.is_empty() && parts.len() < self.config.max_parts_per_section {
            parts.push(RefinementPart {
                segments: window,
                original_chars: window_chars,
            });
        }
        parts
    }

    /// Every segment text the refiner will score for this section, for pre-embedding.
    pub fn segment_texts(&self, scored: &ScoredSection) -> Vec<String> {
        self.partition(&scored.section.body_text)
            .into_iter()
            .flat_map(|p| p.segments)
            .collect()
    }

    /// Semantic + keyword score of one segment, in [0, 1].
    pub fn score_segment(&self, profile: &PersonaProfile, index: &SemanticIndex, segment: &str) -> f64 {
        let keyword =
            keyword_score_with(profile, segment, self.config.sentence_keyword_saturation);

        let semantic = match index.mode() {
            SignalMode::Full => index.similarity(segment),
            SignalMode::Degraded => None,
        };

        match semantic {
            Some(semantic) => {
                let total = self.weights.semantic + self.weights.keyword;
                if total <= 0.0 {
                    return keyword;
                }
                ((self.weights.semantic * semantic + self.weights.keyword * keyword) / total)
                    .clamp(0.0, 1.0)
            }
            None => keyword,
        }
    }

    /// Produces one refined excerpt per part of the section.
    ///
    /// Empty original text yields nothing. A body with no extractable segments
    /// yields the section title with ratio 1.0.
    pub fn refine(
        &self,
        scored: &ScoredSection,
        profile: &PersonaProfile,
        index: &SemanticIndex,
    ) -> Vec<RefinedSubsection> {
        let section = &scored.section;
        if section.body_text.chars().count() == 0 {
            return vec![];
        }

        let section_ref = SectionRef {
            document_id: section.document_id.clone(),
            ordinal: section.ordinal,
            title: section.title.clone(),
            importance_rank: scored.importance_rank,
        };
        let make = |refined_text: String, compression_ratio: f64| RefinedSubsection {
            document_id: section.document_id.clone(),
            page_number: section.page_number,
            original_section_ref: section_ref.clone(),
            refined_text,
            compression_ratio,
        };

        let parts = self.partition(&section.body_text);
        if parts.iter().all(|p| p.segments.is_empty()) {
            let title = section.title.trim();
            let text = if title.is_empty() { UNTITLED } else { title };
            return vec![make(text.to_string(), 1.0)];
        }

        parts
            .iter()
            .filter(|p| !p.segments.is_empty() && p.original_chars > 0)
            .filter_map(|p| {
                let text = self.refine_part(&p.segments, profile, index)?;
                let ratio = (text.chars().count() as f64 / p.original_chars as f64).min(1.0);
                Some(make(text, ratio))
            })
            .collect()
    }

    fn refine_part(
        &self,
        segments: &[String],
        profile: &PersonaProfile,
        index: &SemanticIndex,
    ) -> Option<String> {
        let mut candidates: Vec<usize> = (0..segments.len())
            .filter(|&i| segments[i].chars().count() >= self.config.min_segment_chars)
            .collect();
        if candidates.is_empty() {
            candidates = (0..segments.len()).collect();
        }

        let scores: Vec<(usize, f64)> = candidates
            .into_iter()
            .map(|i| (i, self.score_segment(profile, index, &segments[i])))
            .collect();

        let mut by_score = scores;
        by_score.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut selected: Vec<usize> = Vec::new();
        let mut used_chars = 0usize;
        for &(i, _) in &by_score {
            if selected.len() >= self.config.max_segments {
                break;
            }
            let len = segments[i].chars().count();
            let added = if selected.is_empty() { len } else { len + 1 };
            if used_chars + added <= self.config.max_refined_chars {
                selected.push(i);
                used_chars += added;
            }
        }

        if selected.is_empty() {
            let &(best, _) = by_score.first()?;
            return Some(truncate_at_word(
                &segments[best],
                self.config.max_refined_chars,
            ));
        }

        selected.sort_unstable();
        Some(
            selected
                .into_iter()
                .map(|i| segments[i].as_str())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}
