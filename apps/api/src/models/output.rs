use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted analysis result. Field names are consumed downstream and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub metadata: OutputMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: DateTime<Utc>,
    pub total_documents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub page_number: u32,
    pub section_title: String,
    pub importance_rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub page_number: u32,
    pub refined_text: String,
    pub original_section: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_output_serializes_expected_keys() {
        let output = AnalysisOutput {
            metadata: OutputMetadata {
                input_documents: vec!["a.pdf".to_string()],
                persona: "Researcher".to_string(),
                job_to_be_done: "Survey methods".to_string(),
                processing_timestamp: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
                total_documents: 1,
            },
            extracted_sections: vec![ExtractedSection {
                document: "a.pdf".to_string(),
                page_number: 3,
                section_title: "Methods".to_string(),
                importance_rank: 1,
            }],
            subsection_analysis: vec![SubsectionAnalysis {
                document: "a.pdf".to_string(),
                page_number: 3,
                refined_text: "We sampled 40 sites.".to_string(),
                original_section: "Methods".to_string(),
            }],
        };

        let value = serde_json::to_value(&output).unwrap();
        let metadata = value["metadata"].as_object().unwrap();
        for key in [
            "input_documents",
            "persona",
            "job_to_be_done",
            "processing_timestamp",
            "total_documents",
        ] {
            assert!(metadata.contains_key(key), "missing metadata key {key}");
        }
        assert_eq!(metadata.len(), 5);
        assert_eq!(value["metadata"]["processing_timestamp"], "2025-07-01T12:00:00Z");
        assert_eq!(value["extracted_sections"][0]["section_title"], "Methods");
        assert_eq!(value["extracted_sections"][0]["importance_rank"], 1);
        assert_eq!(value["subsection_analysis"][0]["original_section"], "Methods");
        assert_eq!(value["subsection_analysis"][0]["page_number"], 3);
    }
}
