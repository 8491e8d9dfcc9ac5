// Persona-driven section analysis.
// Implements: keyword table, feature extraction, scoring, ranking, refinement, assembly.
// Embedding calls go through the `embedding` capability; everything after the prefetch is synchronous.

pub mod assembler;
pub mod features;
pub mod handlers;
pub mod keywords;
pub mod pipeline;
pub mod ranking;
pub mod refiner;
pub mod scoring;
pub mod semantic;
