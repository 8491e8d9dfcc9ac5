use serde::{Deserialize, Serialize};

/// The reader role and the task they are trying to get done.
/// Immutable for the duration of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaSpec {
    pub persona_description: String,
    pub job_description: String,
}

impl PersonaSpec {
    pub fn new(persona: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            persona_description: persona.into(),
            job_description: job.into(),
        }
    }

    /// Text embedded once per run as the semantic query: persona followed by job.
    pub fn query_text(&self) -> String {
        format!(
            "{} {}",
            self.persona_description.trim(),
            self.job_description.trim()
        )
    }
}
