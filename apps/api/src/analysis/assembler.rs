//! Result Assembler: maps a ranked, refined run onto the persisted output shape.

use chrono::{DateTime, Utc};

use crate::analysis::pipeline::RankAndRefineOutput;
use crate::models::output::{AnalysisOutput, ExtractedSection, OutputMetadata, SubsectionAnalysis};
use crate::models::persona::PersonaSpec;

/// `input_documents` lists every received document, including ones that were skipped.
pub fn assemble(
    input_documents: &[String],
    persona: &PersonaSpec,
    outcome: &RankAndRefineOutput,
    processed_at: DateTime<Utc>,
) -> AnalysisOutput {
    let extracted_sections = outcome
        .scored
        .iter()
        .map(|s| ExtractedSection {
            document: s.section.document_id.clone(),
            page_number: s.section.page_number,
            section_title: s.section.title.clone(),
            importance_rank: s.importance_rank,
        })
        .collect();

    let subsection_analysis = outcome
        .refined
        .iter()
        .map(|r| SubsectionAnalysis {
            document: r.document_id.clone(),
            page_number: r.page_number,
            refined_text: r.refined_text.clone(),
            original_section: r.original_section_ref.title.clone(),
        })
        .collect();

    AnalysisOutput {
        metadata: OutputMetadata {
            input_documents: input_documents.to_vec(),
            persona: persona.persona_description.clone(),
            job_to_be_done: persona.job_description.clone(),
            processing_timestamp: processed_at,
            total_documents: outcome.documents_used.len(),
        },
        extracted_sections,
        subsection_analysis,
    }
}
