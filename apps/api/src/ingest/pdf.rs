use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::ingest::IngestError;

/// One text string per page, in page order.
///
/// pdf-extract panics on some malformed inputs; that is reported as a parse
/// error for this document only.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, IngestError> {
    let pages = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| IngestError::Parse("extractor panicked on malformed input".to_string()))?
    .map_err(|e| IngestError::Parse(e.to_string()))?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(IngestError::NoText);
    }
    Ok(pages)
}
