// Data enrichment pipeline: ingestion, processing, and orchestration

pub mod ingestion;
pub mod orchestrator;
pub mod processing;

pub use orchestrator::{EnrichmentPipeline, EnrichmentOutput, PipelineInputs, RunConfig, RunMetadata};
