use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, warn};

use lead_enricher::app::enrich_use_case::{EnrichRequest, EnrichUseCase};
use lead_enricher::config::{Config, EnrichToggles};
use lead_enricher::infra::http_client::ReqwestHttp;
use lead_enricher::infra::source_reader::DefaultSourceReader;
use lead_enricher::infra::workbook_writer::{FsArtifactOutput, XlsxWorkbookWriter};
use lead_enricher::observability;
use lead_enricher::pipeline::ingestion::SourceRef;
use lead_enricher::types::Table;

#[derive(Parser)]
#[command(name = "lead_enricher")]
#[command(about = "Enrich parcel lead lists with lookup links and a confidence score")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the enrichment and export a workbook
    Enrich {
        /// Lead file path or shared spreadsheet link
        #[arg(long)]
        leads: String,
        /// Optional Propwire export (path or link)
        #[arg(long)]
        propwire: Option<String>,
        /// Optional PropertyRadar export (path or link)
        #[arg(long)]
        propertyradar: Option<String>,
        /// Batch name used for the output file
        #[arg(long)]
        batch_name: Option<String>,
        /// Directory the workbook is written to
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Skip county GIS lookups
        #[arg(long)]
        no_county: bool,
        /// Skip OSINT people-search links
        #[arg(long)]
        no_osint: bool,
        /// Skip social media searches
        #[arg(long)]
        no_social: bool,
        /// Write Prometheus metrics text here after the run
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },
    /// Load a lead file and show its first rows
    Preview {
        /// Lead file path or shared spreadsheet link
        #[arg(long)]
        leads: String,
        /// Number of rows to show
        #[arg(long, default_value_t = 25)]
        rows: usize,
    },
}

fn print_preview(table: &Table, limit: usize) {
    println!("{}", table.columns().join(" | "));
    for row in table.rows().iter().take(limit) {
        let cells: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("")).collect();
        println!("{}", cells.join(" | "));
    }
    println!("\nℹ️  Detected {} rows · {} columns.", table.len(), table.columns().len());
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok();
    let config = Config::load().context("loading configuration")?;
    let _log_guard = observability::init_logging(&config.logging.dir);

    if let Err(e) = observability::metrics::init() {
        warn!("Metrics disabled: {}", e);
    }

    let cli = Cli::parse();

    let http = ReqwestHttp::new(&config.http)?;
    let reader = DefaultSourceReader::new(Box::new(http));

    match cli.command {
        Commands::Enrich {
            leads,
            propwire,
            propertyradar,
            batch_name,
            output_dir,
            no_county,
            no_osint,
            no_social,
            metrics_file,
        } => {
            println!("🚀 Running enrichment...");

            let output_dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
            let use_case = EnrichUseCase::new(
                Box::new(reader),
                Box::new(XlsxWorkbookWriter::new()),
                Box::new(FsArtifactOutput::new(output_dir)),
            );

            let request = EnrichRequest {
                leads: SourceRef::parse(&leads),
                propwire: propwire.as_deref().map(SourceRef::parse),
                property_radar: propertyradar.as_deref().map(SourceRef::parse),
                toggles: EnrichToggles {
                    county: config.toggles.county && !no_county,
                    osint: config.toggles.osint && !no_osint,
                    social: config.toggles.social && !no_social,
                },
                batch_label: batch_name,
            };

            let result = use_case.run(request).await;

            if let Some(path) = metrics_file {
                match observability::metrics::render() {
                    Some(text) => std::fs::write(&path, text)
                        .with_context(|| format!("writing metrics to {}", path.display()))?,
                    None => warn!("Metrics recorder not installed; skipping metrics file"),
                }
            }

            match result {
                Ok(report) => {
                    println!("✅ Enrichment complete.");
                    println!("   Rows in: {}", report.metadata.rows_in);
                    println!("   Rows out: {}", report.metadata.rows_out);
                    println!("   Columns: {}", report.column_count);
                    println!("   Workbook: {}", report.output_path.display());
                }
                Err(e) => {
                    error!("Enrichment failed: {}", e);
                    println!("❌ {}. Re-export as CSV/XLSX and try again.", e);
                    // Returning drops the log guard so the file writer flushes
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Preview { leads, rows } => {
            let use_case = EnrichUseCase::new(
                Box::new(reader),
                Box::new(XlsxWorkbookWriter::new()),
                Box::new(FsArtifactOutput::new(config.output.dir.clone())),
            );
            let source = SourceRef::parse(&leads);
            match use_case.preview(&source).await {
                Ok(table) if !table.is_empty() => print_preview(&table, rows),
                Ok(_) | Err(_) => {
                    println!("❌ That file looks empty or unreadable. Re-export as CSV/XLSX and re-upload.");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
