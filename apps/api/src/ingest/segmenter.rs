//! Heuristic Section Segmenter: turns page texts into titled `DocumentSection`s.
//!
//! Per page, the first delimiter pattern that yields more than one piece wins:
//! 1. numbered headings (`1. `)
//! 2. long title-like lines (capitalised, no period)
//! 3. ALL-CAPS headers
//! 4. "Chapter 3" style lines
//! 5. markdown `#` headers
//! 6. standalone Introduction / Abstract / Methods / Results / Conclusion / References
//!
//! Otherwise the page splits on blank lines (if it has more than three
//! paragraphs), or stays whole. Pieces are cut *before* the delimiter so the
//! heading stays on the first line of its section.

use regex::Regex;

use crate::ingest::{ExtractedDocument, IngestError};
use crate::models::section::DocumentSection;

const DELIMITER_PATTERNS: &[&str] = &[
    r"(?m)^[ \t]*\d+\.[ \t]+\S",
    r"(?m)^[ \t]*[A-Z][^.\n]{20,}$",
    r"(?m)^[ \t]*[A-Z]{2,}[:\s]",
    r"(?m)^[ \t]*\w+[ \t]+\d+[ \t]*$",
    r"(?m)^[ \t]*#+[ \t]+",
    r"(?im)^[ \t]*(introduction|conclusion|abstract|references|methods|results)[ \t]*$",
];

pub const MIN_SECTION_CHARS: usize = 100;
const MIN_PARAGRAPH_CHARS: usize = 50;
const PARAGRAPH_FALLBACK_MIN: usize = 3;
const TITLE_LINE_MAX_CHARS: usize = 100;
const TITLE_LINE_MAX_WORDS: usize = 12;
const SENTENCE_TITLE_MAX_CHARS: usize = 80;
const PREFIX_TITLE_CHARS: usize = 50;

pub trait Segmenter: Send + Sync {
    fn segment(&self, document: &ExtractedDocument) -> Result<Vec<DocumentSection>, IngestError>;
}

pub struct HeuristicSegmenter {
    delimiters: Vec<Regex>,
    paragraph_break: Regex,
    sentence_end: Regex,
    min_section_chars: usize,
}

impl HeuristicSegmenter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            delimiters: DELIMITER_PATTERNS
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
            paragraph_break: Regex::new(r"\n\s*\n")?,
            sentence_end: Regex::new(r"[.!?]+")?,
            min_section_chars: MIN_SECTION_CHARS,
        })
    }

    fn split_page(&self, page: &str) -> Vec<String> {
        for delimiter in &self.delimiters {
            let pieces = split_before_matches(delimiter, page);
            if pieces.len() > 1 {
                return pieces;
            }
        }

        let paragraphs: Vec<&str> = self.paragraph_break.split(page).collect();
        if paragraphs.len() > PARAGRAPH_FALLBACK_MIN {
            return paragraphs
                .into_iter()
                .map(str::trim)
                .filter(|p| p.chars().count() > MIN_PARAGRAPH_CHARS)
                .map(String::from)
                .collect();
        }

        vec![page.trim().to_string()]
    }

    /// Title and body for one piece. A title taken from the first line is removed from the body.
    pub fn title_and_body(&self, piece: &str) -> (String, String) {
        let piece = piece.trim();
        let (first_line, rest) = piece.split_once('\n').unwrap_or((piece, ""));
        let first_line = first_line.trim();

        if first_line.chars().count() < TITLE_LINE_MAX_CHARS
            && !first_line.ends_with('.')
            && first_line.split_whitespace().count() < TITLE_LINE_MAX_WORDS
        {
            let body = if rest.trim().is_empty() { piece } else { rest.trim() };
            return (first_line.to_string(), body.to_string());
        }

        let sentence = self
            .sentence_end
            .split(piece)
            .next()
            .map(str::trim)
            .unwrap_or_default();
        let title = if sentence.is_empty() {
            let prefix: String = piece.chars().take(PREFIX_TITLE_CHARS).collect();
            format!("{}...", prefix.trim())
        } else if sentence.chars().count() > SENTENCE_TITLE_MAX_CHARS {
            let head: String = sentence.chars().take(SENTENCE_TITLE_MAX_CHARS).collect();
            format!("{head}...")
        } else {
            sentence.to_string()
        };
        (title, piece.to_string())
    }
}

impl Segmenter for HeuristicSegmenter {
    fn segment(&self, document: &ExtractedDocument) -> Result<Vec<DocumentSection>, IngestError> {
        let mut sections = Vec::new();

        for (index, page) in document.pages.iter().enumerate() {
            if page.trim().is_empty() {
                continue;
            }
            for piece in self.split_page(page) {
                if piece.trim().chars().count() < self.min_section_chars {
                    continue;
                }
                let (title, body_text) = self.title_and_body(&piece);
                sections.push(DocumentSection {
                    document_id: document.name.clone(),
                    page_number: (index + 1) as u32,
                    title,
                    body_text,
                    ordinal: sections.len(),
                });
            }
        }

        if sections.is_empty() {
            return Err(IngestError::NoSections);
        }
        Ok(sections)
    }
}

/// Splits `text` at the start of every match, keeping the matched text. Blank pieces are dropped.
fn split_before_matches(pattern: &Regex, text: &str) -> Vec<String> {
    let mut cuts: Vec<usize> = pattern.find_iter(text).map(|m| m.start()).collect();
    cuts.push(text.len());

    let mut pieces = Vec::new();
    let mut start = 0;
    for cut in cuts {
        if cut > start {
            let piece = text[start..cut].trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }
            start = cut;
        }
    }
    pieces
}
