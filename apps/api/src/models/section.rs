use serde::{Deserialize, Serialize};

/// A contiguous block of document text anchored to a page, as produced by the segmenter.
/// Read-only for the analysis core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub document_id: String,
    /// 1-based.
    pub page_number: u32,
    #[serde(default)]
    pub title: String,
    pub body_text: String,
    /// Position within the document, 0-based.
    pub ordinal: usize,
}

impl DocumentSection {
    /// True when the body holds nothing but whitespace. Such sections never get ranked.
    pub fn is_blank(&self) -> bool {
        self.body_text.trim().is_empty()
    }
}

/// Independent relevance signals for one section, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub semantic_score: f64,
    pub keyword_score: f64,
    pub structural_score: f64,
}

impl FeatureVector {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// A section that survived ranking. `importance_rank` is 1-based, 1 = most relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSection {
    pub section: DocumentSection,
    pub features: FeatureVector,
    pub relevance_score: f64,
    pub importance_rank: u32,
}

/// Back-reference from a refined excerpt to the ranked section it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRef {
    pub document_id: String,
    pub ordinal: usize,
    pub title: String,
    pub importance_rank: u32,
}

/// Compressed excerpt of a ranked section's most salient sentences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedSubsection {
    pub document_id: String,
    pub page_number: u32,
    pub original_section_ref: SectionRef,
    pub refined_text: String,
    /// refined length / original length, in (0, 1].
    pub compression_ratio: f64,
}
