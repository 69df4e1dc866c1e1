// Ingestion pipeline: normalization steps and the run orchestrator

pub mod orchestrator;
pub mod processing;
