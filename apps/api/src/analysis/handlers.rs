//! Axum route handlers for the Analysis API.

use std::future::Future;
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::analysis::assembler::assemble;
use crate::errors::AppError;
use crate::ingest::{ExtractedDocument, Segmenter};
use crate::models::output::AnalysisOutput;
use crate::models::persona::PersonaSpec;
use crate::models::section::DocumentSection;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeSectionsRequest {
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub job_to_be_done: String,
    pub max_sections: Option<usize>,
    #[serde(default)]
    pub documents: Vec<DocumentInput>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentInput {
    pub name: String,
    pub sections: Vec<SectionInput>,
}

#[derive(Debug, Deserialize)]
pub struct SectionInput {
    pub page_number: u32,
    #[serde(default)]
    pub title: String,
    pub body_text: String,
}

impl DocumentInput {
    fn into_sections(self) -> Vec<DocumentSection> {
        let name = self.name;
        self.sections
            .into_iter()
            .enumerate()
            .map(|(ordinal, s)| DocumentSection {
                document_id: name.clone(),
                page_number: s.page_number,
                title: s.title,
                body_text: s.body_text,
                ordinal,
            })
            .collect()
    }
}

/// Fields collected from the multipart form of `/api/v1/analyze`.
#[derive(Debug, Default)]
struct AnalyzeForm {
    persona: String,
    job_to_be_done: String,
    max_sections: Option<usize>,
    files: Vec<(String, Bytes)>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyze
///
/// Multipart upload: repeated `files` (PDF only), `persona`, `job_to_be_done`,
/// optional `max_sections`. Extraction and segmentation run on the blocking pool.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisOutput>, AppError> {
    let form = read_analyze_form(multipart).await?;
    let persona = validated_persona(&form.persona, &form.job_to_be_done)?;
    if form.files.is_empty() {
        return Err(AppError::Validation(
            "at least one .pdf file is required".to_string(),
        ));
    }

    let input_documents: Vec<String> = form.files.iter().map(|(name, _)| name.clone()).collect();
    info!(
        documents = input_documents.len(),
        persona = %persona.persona_description,
        "Received analysis upload"
    );

    let timeout_secs = state.config.request_timeout_secs;
    with_timeout(timeout_secs, async move {
        let segmenter = state.segmenter.clone();
        let sections = tokio::task::spawn_blocking(move || ingest_files(segmenter.as_ref(), form.files))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in ingest: {e}")))?;

        run_analysis(&state, &persona, &input_documents, &sections, form.max_sections).await
    })
    .await
    .map(Json)
}

/// POST /api/v1/analyze/sections
///
/// Same analysis over documents that were segmented by the caller.
pub async fn handle_analyze_sections(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeSectionsRequest>,
) -> Result<Json<AnalysisOutput>, AppError> {
    let persona = validated_persona(&request.persona, &request.job_to_be_done)?;
    if request.documents.is_empty() {
        return Err(AppError::Validation("documents cannot be empty".to_string()));
    }

    let input_documents: Vec<String> = request.documents.iter().map(|d| d.name.clone()).collect();
    let sections: Vec<DocumentSection> = request
        .documents
        .into_iter()
        .flat_map(DocumentInput::into_sections)
        .collect();

    let timeout_secs = state.config.request_timeout_secs;
    with_timeout(
        timeout_secs,
        run_analysis(&state, &persona, &input_documents, &sections, request.max_sections),
    )
    .await
    .map(Json)
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn validated_persona(persona: &str, job: &str) -> Result<PersonaSpec, AppError> {
    if persona.trim().is_empty() {
        return Err(AppError::Validation("persona cannot be empty".to_string()));
    }
    if job.trim().is_empty() {
        return Err(AppError::Validation("job_to_be_done cannot be empty".to_string()));
    }
    Ok(PersonaSpec::new(persona.trim(), job.trim()))
}

async fn with_timeout<F>(secs: u64, work: F) -> Result<AnalysisOutput, AppError>
where
    F: Future<Output = Result<AnalysisOutput, AppError>>,
{
    tokio::time::timeout(Duration::from_secs(secs), work)
        .await
        .map_err(|_| AppError::Timeout(secs))?
}

async fn run_analysis(
    state: &AppState,
    persona: &PersonaSpec,
    input_documents: &[String],
    sections: &[DocumentSection],
    max_sections: Option<usize>,
) -> Result<AnalysisOutput, AppError> {
    let k = max_sections.unwrap_or(state.config.max_sections);
    let outcome = state.analyzer.rank_and_refine(persona, sections, k).await?;
    if !outcome.skipped_documents.is_empty() {
        let skipped: Vec<&str> = outcome
            .skipped_documents
            .iter()
            .map(|s| s.document_id.as_str())
            .collect();
        info!(mode = ?outcome.signal_mode, ?skipped, "Some documents were left out of the ranking");
    }
    Ok(assemble(input_documents, persona, &outcome, Utc::now()))
}

async fn read_analyze_form(mut multipart: Multipart) -> Result<AnalyzeForm, AppError> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read '{filename}': {e}")))?;
                if filename.to_lowercase().ends_with(".pdf") {
                    form.files.push((filename, data));
                } else {
                    warn!("Ignoring non-PDF upload '{filename}'");
                }
            }
            "persona" | "job_to_be_done" | "max_sections" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read '{name}': {e}")))?;
                match name.as_str() {
                    "persona" => form.persona = value,
                    "job_to_be_done" => form.job_to_be_done = value,
                    _ => {
                        let k = value.trim().parse::<usize>().map_err(|_| {
                            AppError::Validation(format!(
                                "max_sections must be a positive integer (got '{value}')"
                            ))
                        })?;
                        form.max_sections = Some(k);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Extracts and segments every upload. A failing document is logged and left out.
fn ingest_files(segmenter: &dyn Segmenter, files: Vec<(String, Bytes)>) -> Vec<DocumentSection> {
    let mut sections = Vec::new();
    for (name, data) in files {
        let result = ExtractedDocument::from_pdf(name.as_str(), &data)
            .and_then(|doc| segmenter.segment(&doc));
        match result {
            Ok(mut found) => sections.append(&mut found),
            Err(e) => warn!("Skipping document '{name}': {e}"),
        }
    }
    sections
}
