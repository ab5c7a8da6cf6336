use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::ingestion::SourceRef;
use crate::pipeline::orchestrator::EnrichmentOutput;

#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Raw bytes for a lead or export source
#[async_trait]
pub trait SourceReaderPort: Send + Sync {
    async fn read(&self, source: &SourceRef) -> Result<Vec<u8>>;
}

/// Serializes an enrichment result into workbook bytes
pub trait WorkbookWriter: Send + Sync {
    fn write(&self, output: &EnrichmentOutput) -> Result<Vec<u8>>;
}

/// Persists the finished workbook and reports where it went
#[async_trait]
pub trait ArtifactOutputPort: Send + Sync {
    async fn write_artifact(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}
