//! Persona keyword table: maps persona fragments to keyword families and builds
//! the per-run keyword set from the persona plus the job description.
//!
//! The table is an explicit immutable value handed to the feature extractor at
//! construction, so tests can swap variants without touching shared state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::persona::PersonaSpec;

/// Words dropped before keyword matching and hashing.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "can", "this", "that",
    "these", "those", "from", "into", "about", "your", "you", "our", "their", "its", "also",
    "not", "all", "any", "each", "more", "most", "some", "such", "than", "then", "there",
    "which", "who", "whom", "what", "when", "where", "how", "why",
];

const MIN_TOKEN_CHARS: usize = 3;

/// Lowercases, splits on anything that is not alphanumeric, and drops stop words
/// and tokens shorter than three characters. Order and duplicates are preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Collapses all whitespace runs into single spaces and lowercases.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword table
// ────────────────────────────────────────────────────────────────────────────

/// Keywords associated with any persona whose description contains `persona_fragment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordFamily {
    pub persona_fragment: String,
    pub keywords: BTreeSet<String>,
}

impl KeywordFamily {
    pub fn new(persona_fragment: &str, keywords: &[&str]) -> Self {
        Self {
            persona_fragment: persona_fragment.to_lowercase(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// Static persona → keyword-family mapping. Consulted by case-insensitive substring match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaKeywordTable {
    families: Vec<KeywordFamily>,
}

impl PersonaKeywordTable {
    pub fn new(families: Vec<KeywordFamily>) -> Self {
        Self { families }
    }

    /// A table with no families; every persona falls back to job-derived keywords.
    #[cfg(test)]
    pub fn empty() -> Self {
        Self { families: vec![] }
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Union of every family whose fragment occurs in the persona description.
    pub fn lookup(&self, persona_description: &str) -> BTreeSet<String> {
        let persona = persona_description.to_lowercase();
        self.families
            .iter()
            .filter(|f| !f.persona_fragment.is_empty() && persona.contains(&f.persona_fragment))
            .flat_map(|f| f.keywords.iter().cloned())
            .collect()
    }
}

impl Default for PersonaKeywordTable {
    fn default() -> Self {
        Self::new(vec![
            KeywordFamily::new(
                "research",
                &[
                    "methodology", "method", "dataset", "results", "experiment", "evaluation",
                    "benchmark", "analysis", "findings", "literature", "hypothesis",
                ],
            ),
            KeywordFamily::new(
                "student",
                &[
                    "concept", "definition", "example", "exercise", "theory", "principle",
                    "summary", "exam", "mechanism", "reaction",
                ],
            ),
            KeywordFamily::new(
                "analyst",
                &[
                    "revenue", "growth", "trend", "market", "profit", "margin", "forecast",
                    "investment", "strategy", "performance",
                ],
            ),
            KeywordFamily::new(
                "investment",
                &[
                    "revenue", "earnings", "capital", "portfolio", "return", "risk",
                    "valuation", "cash", "dividend",
                ],
            ),
            KeywordFamily::new(
                "journalist",
                &["source", "interview", "statement", "event", "report", "timeline", "impact"],
            ),
            KeywordFamily::new(
                "travel",
                &[
                    "itinerary", "hotel", "restaurant", "beach", "nightlife", "activities",
                    "budget", "transport", "tips", "cuisine", "attractions",
                ],
            ),
            KeywordFamily::new(
                "hr professional",
                &[
                    "form", "fillable", "signature", "onboarding", "compliance", "employee",
                    "document", "field", "workflow",
                ],
            ),
            KeywordFamily::new(
                "human resources",
                &["form", "onboarding", "compliance", "employee", "policy", "benefits"],
            ),
            KeywordFamily::new(
                "food",
                &[
                    "vegetarian", "vegan", "gluten", "recipe", "ingredients", "menu", "buffet",
                    "dinner", "serving", "dish",
                ],
            ),
            KeywordFamily::new(
                "chef",
                &["recipe", "ingredients", "preparation", "cooking", "dish", "menu"],
            ),
            KeywordFamily::new(
                "sales",
                &["customer", "pipeline", "deal", "pricing", "target", "prospect", "lead"],
            ),
            KeywordFamily::new(
                "entrepreneur",
                &["startup", "funding", "customer", "market", "product", "growth", "business"],
            ),
            KeywordFamily::new(
                "engineer",
                &[
                    "architecture", "implementation", "performance", "design", "system",
                    "requirements", "testing",
                ],
            ),
            KeywordFamily::new(
                "teacher",
                &["curriculum", "lesson", "learning", "assessment", "objective", "activity"],
            ),
        ])
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-run profile
// ────────────────────────────────────────────────────────────────────────────

/// Keyword set derived once per run from the persona and job, reused for every section.
#[derive(Debug, Clone)]
pub struct PersonaProfile {
    pub keywords: BTreeSet<String>,
    /// True when the keyword table contributed at least one family.
    pub table_matched: bool,
}

impl PersonaProfile {
    /// Table families for the persona unioned with the job description's content words.
    pub fn build(persona: &PersonaSpec, table: &PersonaKeywordTable) -> Self {
        let family_keywords = table.lookup(&persona.persona_description);
        let table_matched = !family_keywords.is_empty();

        let mut keywords = family_keywords;
        keywords.extend(tokenize(&persona.job_description));

        Self {
            keywords,
            table_matched,
        }
    }

    /// Number of distinct profile keywords present in `text`.
    ///
    /// Single-word keywords match whole tokens; multi-word keywords match as
    /// substrings of the whitespace-normalised lowercase text.
    pub fn count_hits(&self, text: &str) -> usize {
        let tokens: BTreeSet<String> = tokenize(text).into_iter().collect();
        let normalized = normalize_text(text);

        self.keywords
            .iter()
            .filter(|kw| {
                if kw.contains(' ') {
                    normalized.contains(kw.as_str())
                } else {
                    tokens.contains(kw.as_str())
                }
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        let tokens = tokenize("The Results of an experiment, on 3 datasets!");
        assert_eq!(tokens, vec!["results", "experiment", "datasets"]);
    }

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("  Case\n\tStudy  Notes "), "case study notes");
    }

    #[test]
    fn test_lookup_matches_fragment_case_insensitively() {
        let table = PersonaKeywordTable::default();
        let keywords = table.lookup("PhD Researcher in Computational Biology");
        assert!(keywords.contains("methodology"));
        assert!(keywords.contains("dataset"));
    }

    #[test]
    fn test_lookup_unions_multiple_families() {
        let table = PersonaKeywordTable::default();
        let keywords = table.lookup("Investment Analyst");
        assert!(keywords.contains("forecast"));
        assert!(keywords.contains("valuation"));
    }

    #[test]
    fn test_unknown_persona_falls_back_to_job_keywords() {
        let table = PersonaKeywordTable::default();
        let persona = PersonaSpec::new("Beekeeper", "Compare hive ventilation designs");
        let profile = PersonaProfile::build(&persona, &table);

        assert!(!profile.table_matched);
        let expected: BTreeSet<String> = ["compare", "hive", "ventilation", "designs"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(profile.keywords, expected);
    }

    #[test]
    fn test_substituted_table_does_not_leak() {
        let custom = PersonaKeywordTable::new(vec![KeywordFamily::new("beekeeper", &["honey"])]);
        let persona = PersonaSpec::new("Beekeeper", "Plan harvest");

        let with_custom = PersonaProfile::build(&persona, &custom);
        let with_default = PersonaProfile::build(&persona, &PersonaKeywordTable::default());

        assert!(with_custom.keywords.contains("honey"));
        assert!(!with_default.keywords.contains("honey"));
    }

    #[test]
    fn test_count_hits_is_deduplicated_and_case_insensitive() {
        let table = PersonaKeywordTable::new(vec![KeywordFamily::new(
            "researcher",
            &["dataset", "results", "case study"],
        )]);
        let profile = PersonaProfile::build(&PersonaSpec::new("Researcher", ""), &table);

        let hits = profile.count_hits("Dataset DATASET dataset. Our results follow a Case   Study.");
        assert_eq!(hits, 3);
    }

    #[test]
    fn test_empty_table_has_no_families() {
        let table = PersonaKeywordTable::empty();
        assert!(table.is_empty());
        assert!(table.lookup("Researcher").is_empty());
        assert!(PersonaKeywordTable::default().len() > 5);
    }
}
