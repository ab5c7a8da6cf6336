use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::config::EnrichToggles;
use crate::constants;
use crate::error::{EnrichError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::enrich::{GisLinks, LinkSynthesizer, OsintLinks, SocialLinks};
use crate::pipeline::processing::merge::merge_on_apn;
use crate::pipeline::processing::normalize::{DefaultNormalizer, Normalizer};
use crate::pipeline::processing::score::{confidence_score, format_score};
use crate::types::{CanonicalLead, Table};

/// Secondary exports merged onto the lead table, in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondarySource {
    Propwire,
    PropertyRadar,
}

impl SecondarySource {
    pub const MERGE_ORDER: [SecondarySource; 2] = [SecondarySource::Propwire, SecondarySource::PropertyRadar];

    /// Suffix appended to colliding secondary columns
    pub fn suffix(&self) -> &'static str {
        match self {
            SecondarySource::Propwire => "_pw",
            SecondarySource::PropertyRadar => "_pr",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SecondarySource::Propwire => "propwire",
            SecondarySource::PropertyRadar => "propertyradar",
        }
    }
}

/// Loader outcomes handed to the pipeline. `None` means absent or unreadable.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub leads: Option<Table>,
    pub propwire: Option<Table>,
    pub property_radar: Option<Table>,
}

impl PipelineInputs {
    pub fn secondary(&self, source: SecondarySource) -> Option<&Table> {
        match source {
            SecondarySource::Propwire => self.propwire.as_ref(),
            SecondarySource::PropertyRadar => self.property_radar.as_ref(),
        }
    }
}

/// Explicit per-run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub toggles: EnrichToggles,
    pub batch_label: String,
}

/// Run metadata exported as a single-row sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub rows_in: usize,
    pub rows_out: usize,
    pub toggles: EnrichToggles,
}

/// One example value per output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnExample {
    pub column: String,
    pub example: String,
}

/// Everything the workbook writer needs
#[derive(Debug, Clone)]
pub struct EnrichmentOutput {
    pub table: Table,
    pub metadata: RunMetadata,
    pub columns: Vec<ColumnExample>,
    pub batch_label: String,
}

/// Sequences normalize -> merge -> link synthesis -> scoring for one run.
pub struct EnrichmentPipeline {
    normalizer: Box<dyn Normalizer + Send + Sync>,
}

impl Default for EnrichmentPipeline {
    fn default() -> Self {
        Self::new(Box::new(DefaultNormalizer::new()))
    }
}

impl EnrichmentPipeline {
    pub fn new(normalizer: Box<dyn Normalizer + Send + Sync>) -> Self {
        Self { normalizer }
    }

    /// Link families enabled by `toggles`, in output order.
    fn link_sets(toggles: &EnrichToggles) -> Vec<Box<dyn LinkSynthesizer>> {
        let mut sets: Vec<Box<dyn LinkSynthesizer>> = Vec::new();
        if toggles.county {
            sets.push(Box::new(GisLinks));
        }
        if toggles.osint {
            sets.push(Box::new(OsintLinks));
        }
        if toggles.social {
            sets.push(Box::new(SocialLinks));
        }
        sets
    }

    pub fn run(&self, inputs: PipelineInputs, config: &RunConfig) -> Result<EnrichmentOutput> {
        let span = info_span!("enrichment", batch = %config.batch_label);
        let _enter = span.enter();
        metrics::pipeline::run_started();

        let leads = match inputs.leads.as_ref() {
            None => {
                metrics::pipeline::run_failed("unreadable");
                return Err(EnrichError::UnreadableSource("leads".to_string()));
            }
            Some(t) if t.is_empty() => {
                metrics::pipeline::run_failed("empty");
                return Err(EnrichError::EmptySource("leads".to_string()));
            }
            Some(t) => t.clone(),
        };

        let rows_in = leads.len();
        info!(rows_in, columns = leads.columns().len(), "Normalizing lead table");
        let mut table = self.normalizer.normalize(leads);

        for source in SecondarySource::MERGE_ORDER {
            match inputs.secondary(source) {
                Some(secondary) if !secondary.is_empty() => {
                    let before = table.len();
                    table = merge_on_apn(table, Some(secondary), source.suffix());
                    if table.len() > before {
                        warn!(
                            source = source.label(),
                            extra_rows = table.len() - before,
                            "Duplicate parcel keys fanned out base rows"
                        );
                    }
                }
                _ => debug!(source = source.label(), "Secondary export not provided"),
            }
        }

        for set in Self::link_sets(&config.toggles) {
            let links = set.synthesize(&table);
            debug!(set = set.name(), columns = links.columns().len(), "Appending link columns");
            metrics::pipeline::link_columns_added(set.name(), links.columns().len() as u64);
            table.append_columns(links);
        }

        let scores: Vec<Option<String>> = (0..table.len())
            .map(|row| {
                let score = confidence_score(&CanonicalLead::from_row(&table, row));
                metrics::pipeline::confidence_recorded(score);
                Some(format_score(score))
            })
            .collect();
        table.set_column(constants::CONFIDENCE_SCORE, scores);

        let metadata = RunMetadata {
            rows_in,
            rows_out: table.len(),
            toggles: config.toggles,
        };
        metrics::pipeline::rows(metadata.rows_in as u64, metadata.rows_out as u64);
        info!(rows_in = metadata.rows_in, rows_out = metadata.rows_out, "Enrichment complete");

        let columns = column_dictionary(&table);
        Ok(EnrichmentOutput {
            table,
            metadata,
            columns,
            batch_label: config.batch_label.clone(),
        })
    }
}

/// First non-missing value per column, `""` for columns with none.
pub fn column_dictionary(table: &Table) -> Vec<ColumnExample> {
    table
        .columns()
        .iter()
        .map(|column| ColumnExample {
            column: column.clone(),
            example: table.first_value(column).unwrap_or("").to_string(),
        })
        .collect()
}
