use std::path::PathBuf;

use async_trait::async_trait;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::info;

use crate::app::ports::{ArtifactOutputPort, WorkbookWriter};
use crate::constants;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::orchestrator::EnrichmentOutput;

/// Columns written as numbers rather than text.
const NUMERIC_COLUMNS: [&str; 1] = [constants::CONFIDENCE_SCORE];

/// Writes `enriched`, `meta` and `columns` sheets into an .xlsx workbook.
#[derive(Default)]
pub struct XlsxWorkbookWriter;

impl XlsxWorkbookWriter {
    pub fn new() -> Self {
        Self
    }

    fn write_header(sheet: &mut Worksheet, headers: &[&str]) -> Result<()> {
        let bold = Format::new().set_bold();
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        Ok(())
    }

    fn write_enriched(sheet: &mut Worksheet, output: &EnrichmentOutput) -> Result<()> {
        sheet.set_name(constants::SHEET_ENRICHED)?;
        let table = &output.table;
        let headers: Vec<&str> = table.columns().iter().map(String::as_str).collect();
        Self::write_header(sheet, &headers)?;

        let numeric: Vec<bool> = headers.iter().map(|h| NUMERIC_COLUMNS.contains(h)).collect();
        for (row_idx, row) in table.rows().iter().enumerate() {
            let xl_row = row_idx as u32 + 1;
            for (col_idx, cell) in row.iter().enumerate() {
                let Some(value) = cell else { continue };
                let col = col_idx as u16;
                match value.parse::<f64>() {
                    Ok(number) if numeric[col_idx] => {
                        sheet.write_number(xl_row, col, number)?;
                    }
                    _ => {
                        sheet.write_string(xl_row, col, value)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_meta(sheet: &mut Worksheet, output: &EnrichmentOutput) -> Result<()> {
        sheet.set_name(constants::SHEET_META)?;
        Self::write_header(sheet, &["rows_in", "rows_out", "toggles"])?;
        let meta = &output.metadata;
        sheet.write_number(1, 0, meta.rows_in as f64)?;
        sheet.write_number(1, 1, meta.rows_out as f64)?;
        sheet.write_string(1, 2, serde_json::to_string(&meta.toggles)?)?;
        Ok(())
    }

    fn write_columns(sheet: &mut Worksheet, output: &EnrichmentOutput) -> Result<()> {
        sheet.set_name(constants::SHEET_COLUMNS)?;
        Self::write_header(sheet, &["column", "example"])?;
        for (idx, entry) in output.columns.iter().enumerate() {
            let row = idx as u32 + 1;
            sheet.write_string(row, 0, &entry.column)?;
            sheet.write_string(row, 1, &entry.example)?;
        }
        Ok(())
    }
}

impl WorkbookWriter for XlsxWorkbookWriter {
    fn write(&self, output: &EnrichmentOutput) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        Self::write_enriched(workbook.add_worksheet(), output)?;
        Self::write_meta(workbook.add_worksheet(), output)?;
        Self::write_columns(workbook.add_worksheet(), output)?;

        let bytes = workbook.save_to_buffer()?;
        metrics::writer::workbook_written(bytes.len());
        Ok(bytes)
    }
}

/// Saves artifacts under a directory, creating it on first write.
pub struct FsArtifactOutput {
    dir: PathBuf,
}

impl FsArtifactOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactOutputPort for FsArtifactOutput {
    async fn write_artifact(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Wrote workbook");
        Ok(path)
    }
}
