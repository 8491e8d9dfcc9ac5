// Ingest: PDF bytes → per-page text → DocumentSections.
// Everything here is CPU-bound and synchronous; handlers call it via spawn_blocking.

pub mod pdf;
pub mod segmenter;

use thiserror::Error;

pub use segmenter::{HeuristicSegmenter, Segmenter};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("no extractable text on any page")]
    NoText,

    #[error("no sections long enough to analyse")]
    NoSections,
}

/// A document as delivered by the extractor: a name plus one text string per page.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub name: String,
    pub pages: Vec<String>,
}

impl ExtractedDocument {
    pub fn new(name: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            pages,
        }
    }

    /// Parses `bytes` as a PDF and keeps its page texts.
    pub fn from_pdf(name: impl Into<String>, bytes: &[u8]) -> Result<Self, IngestError> {
        Ok(Self::new(name, pdf::extract_pages(bytes)?))
    }
}
