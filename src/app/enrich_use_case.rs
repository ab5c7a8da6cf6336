use std::path::PathBuf;

use chrono::Local;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::app::ports::{ArtifactOutputPort, SourceReaderPort, WorkbookWriter};
use crate::config::EnrichToggles;
use crate::constants;
use crate::error::{EnrichError, Result};
use crate::pipeline::ingestion::{load_table, SourceRef};
use crate::pipeline::orchestrator::{EnrichmentPipeline, PipelineInputs, RunConfig, RunMetadata, SecondarySource};
use crate::types::Table;

/// What the caller asked for in one enrichment run
#[derive(Debug, Clone)]
pub struct EnrichRequest {
    pub leads: SourceRef,
    pub propwire: Option<SourceRef>,
    pub property_radar: Option<SourceRef>,
    pub toggles: EnrichToggles,
    pub batch_label: Option<String>,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct EnrichReport {
    pub output_path: PathBuf,
    pub metadata: RunMetadata,
    pub column_count: usize,
    pub batch_label: String,
}

/// Timestamp label used when the caller does not name the batch
pub fn default_batch_label() -> String {
    format!("batch_{}", Local::now().format("%Y%m%d_%H%M"))
}

/// Batch label safe to use as a file stem: path separators become `_`.
fn file_safe_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// Use case for loading sources, enriching them and exporting a workbook
pub struct EnrichUseCase {
    reader: Box<dyn SourceReaderPort>,
    writer: Box<dyn WorkbookWriter>,
    output: Box<dyn ArtifactOutputPort>,
    pipeline: EnrichmentPipeline,
}

impl EnrichUseCase {
    pub fn new(
        reader: Box<dyn SourceReaderPort>,
        writer: Box<dyn WorkbookWriter>,
        output: Box<dyn ArtifactOutputPort>,
    ) -> Self {
        Self {
            reader,
            writer,
            output,
            pipeline: EnrichmentPipeline::default(),
        }
    }

    /// Read and parse a source. Read and parse failures are both `None`.
    pub async fn load(&self, source: &SourceRef) -> Option<Table> {
        match self.reader.read(source).await {
            Ok(bytes) => load_table(&bytes, &source.name_hint()),
            Err(e) => {
                warn!(source = %source, error = %e, "Failed to read source");
                None
            }
        }
    }

    /// Load a source for display, failing when it is unreadable.
    pub async fn preview(&self, source: &SourceRef) -> Result<Table> {
        let bytes = self.reader.read(source).await?;
        load_table(&bytes, &source.name_hint()).ok_or_else(|| EnrichError::UnreadableSource(source.to_string()))
    }

    async fn load_secondary(&self, kind: SecondarySource, source: Option<&SourceRef>) -> Option<Table> {
        let source = source?;
        let table = self.load(source).await;
        if table.is_none() {
            warn!(source = %source, kind = kind.label(), "Secondary export unreadable; skipping merge");
        }
        table
    }

    pub async fn run(&self, request: EnrichRequest) -> Result<EnrichReport> {
        let batch_label = request
            .batch_label
            .clone()
            .filter(|label| !label.trim().is_empty())
            .map(|label| file_safe_label(&label))
            .unwrap_or_else(default_batch_label);
        let run_id = Uuid::new_v4();
        let span = info_span!("enrichment_run", run_id = %run_id, batch = %batch_label);

        self.run_batch(request, batch_label).instrument(span).await
    }

    async fn run_batch(&self, request: EnrichRequest, batch_label: String) -> Result<EnrichReport> {
        info!(leads = %request.leads, "Starting enrichment run");

        let leads = self.reader.read(&request.leads).await?;
        let leads = load_table(&leads, &request.leads.name_hint())
            .ok_or_else(|| EnrichError::UnreadableSource(request.leads.to_string()))?;
        if leads.is_empty() {
            return Err(EnrichError::EmptySource(request.leads.to_string()));
        }

        let inputs = PipelineInputs {
            leads: Some(leads),
            propwire: self
                .load_secondary(SecondarySource::Propwire, request.propwire.as_ref())
                .await,
            property_radar: self
                .load_secondary(SecondarySource::PropertyRadar, request.property_radar.as_ref())
                .await,
        };

        let config = RunConfig {
            toggles: request.toggles,
            batch_label: batch_label.clone(),
        };
        let output = self.pipeline.run(inputs, &config)?;

        let bytes = self.writer.write(&output)?;
        let file_name = format!("{}.{}", batch_label, constants::WORKBOOK_EXTENSION);
        let output_path = self.output.write_artifact(&file_name, &bytes).await?;

        Ok(EnrichReport {
            output_path,
            column_count: output.table.columns().len(),
            metadata: output.metadata,
            batch_label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::orchestrator::EnrichmentOutput;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MockReader {
        sources: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl SourceReaderPort for MockReader {
        async fn read(&self, source: &SourceRef) -> Result<Vec<u8>> {
            self.sources
                .get(&source.to_string())
                .cloned()
                .ok_or_else(|| EnrichError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing")))
        }
    }

    struct MockWriter {
        seen: Arc<std::sync::Mutex<Vec<EnrichmentOutput>>>,
    }

    impl WorkbookWriter for MockWriter {
        fn write(&self, output: &EnrichmentOutput) -> Result<Vec<u8>> {
            self.seen.lock().unwrap().push(output.clone());
            Ok(b"workbook".to_vec())
        }
    }

    struct MockOutput {
        files: Arc<tokio::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ArtifactOutputPort for MockOutput {
        async fn write_artifact(&self, file_name: &str, _bytes: &[u8]) -> Result<PathBuf> {
            self.files.lock().await.push(file_name.to_string());
            Ok(PathBuf::from("out").join(file_name))
        }
    }

    struct Harness {
        use_case: EnrichUseCase,
        seen: Arc<std::sync::Mutex<Vec<EnrichmentOutput>>>,
        files: Arc<tokio::sync::Mutex<Vec<String>>>,
    }

    fn harness(sources: &[(&str, &str)]) -> Harness {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let files = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let reader = MockReader {
            sources: sources.iter().map(|(k, v)| (k.to_string(), v.as_bytes().to_vec())).collect(),
        };
        let use_case = EnrichUseCase::new(
            Box::new(reader),
            Box::new(MockWriter { seen: seen.clone() }),
            Box::new(MockOutput { files: files.clone() }),
        );
        Harness { use_case, seen, files }
    }

    fn request(leads: &str) -> EnrichRequest {
        EnrichRequest {
            leads: SourceRef::parse(leads),
            propwire: None,
            property_radar: None,
            toggles: EnrichToggles::default(),
            batch_label: Some("batch_unit".to_string()),
        }
    }

    #[tokio::test]
    async fn test_run_writes_named_workbook() {
        let h = harness(&[("leads.csv", "APN,Address\n12-345,1 Elm St\n")]);

        let report = h.use_case.run(request("leads.csv")).await.unwrap();

        assert_eq!(report.batch_label, "batch_unit");
        assert_eq!(report.output_path, PathBuf::from("out/batch_unit.xlsx"));
        assert_eq!(report.metadata.rows_in, 1);
        assert_eq!(h.files.lock().await.as_slice(), ["batch_unit.xlsx"]);
        let seen = h.seen.lock().unwrap();
        assert_eq!(seen[0].table.text(0, "Property Address"), "1 Elm St");
    }

    #[tokio::test]
    async fn test_unreadable_secondary_is_skipped() {
        let h = harness(&[
            ("leads.csv", "APN,City\n1,Reno\n"),
            ("radar.csv", "APN,Owner\n1,Ann\n"),
        ]);
        let mut req = request("leads.csv");
        req.propwire = Some(SourceRef::parse("missing.csv"));
        req.property_radar = Some(SourceRef::parse("radar.csv"));

        let report = h.use_case.run(req).await.unwrap();
        assert_eq!(report.metadata.rows_out, 1);
        let seen = h.seen.lock().unwrap();
        assert_eq!(seen[0].table.text(0, "Owner"), "Ann");
    }

    #[tokio::test]
    async fn test_header_only_leads_fail_without_export() {
        let h = harness(&[("leads.csv", "APN,City\n")]);

        let err = h.use_case.run(request("leads.csv")).await.unwrap_err();
        assert!(matches!(err, EnrichError::EmptySource(_)));
        assert!(h.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_leads_propagate_read_error() {
        let h = harness(&[]);
        let err = h.use_case.run(request("nope.csv")).await.unwrap_err();
        assert!(matches!(err, EnrichError::Io(_)));
    }

    #[tokio::test]
    async fn test_blank_batch_label_falls_back_to_timestamp() {
        let h = harness(&[("leads.csv", "APN,City\n1,Reno\n")]);
        let mut req = request("leads.csv");
        req.batch_label = Some("  ".to_string());

        let report = h.use_case.run(req).await.unwrap();
        assert!(report.batch_label.starts_with("batch_"));
        assert_eq!(report.batch_label.len(), "batch_20260101_1200".len());
    }

    #[tokio::test]
    async fn test_batch_label_cannot_leave_output_dir() {
        let h = harness(&[("leads.csv", "APN,City\n1,Reno\n")]);
        let mut req = request("leads.csv");
        req.batch_label = Some("../up\\over/x".to_string());

        let report = h.use_case.run(req).await.unwrap();
        assert_eq!(report.batch_label, ".._up_over_x");
        assert_eq!(report.output_path, PathBuf::from("out/.._up_over_x.xlsx"));
        assert_eq!(h.files.lock().await.as_slice(), [".._up_over_x.xlsx"]);
    }

    #[tokio::test]
    async fn test_preview_reports_unreadable_source() {
        let h = harness(&[("bad.bin", "")]);
        let err = h.use_case.preview(&SourceRef::parse("bad.bin")).await.unwrap_err();
        assert!(matches!(err, EnrichError::UnreadableSource(_)));
    }
}
