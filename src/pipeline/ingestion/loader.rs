use std::io::{Cursor, Read, Seek};

use calamine::{open_workbook_auto_from_rs, open_workbook_from_rs, Data, DataType, Range, Reader, Xls, Xlsx};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::observability::metrics;
use crate::types::{Row, Table};

const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];
const UTF8_BOM: &str = "\u{feff}";

/// One parse attempt in the loader's fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Excel Open XML workbook
    Xlsx,
    /// Legacy binary Excel workbook
    Xls,
    /// Any workbook format calamine can detect from the bytes
    WorkbookSniff,
    /// Delimited text. With `multi_column` set, a header that does not split
    /// into at least two columns counts as a failure.
    Delimited { delimiter: u8, multi_column: bool },
}

impl LoadStrategy {
    /// Ordered attempts for a source, based on its file name or URL.
    pub fn plan(name_hint: &str) -> Vec<LoadStrategy> {
        let hint = name_hint.to_lowercase();
        let mut plan = Vec::new();
        if hint.ends_with(".xlsx") {
            plan.push(LoadStrategy::Xlsx);
        }
        if hint.ends_with(".xls") {
            plan.push(LoadStrategy::Xls);
        }
        plan.push(LoadStrategy::WorkbookSniff);

        let mut delimiters = DELIMITERS.to_vec();
        if hint.ends_with(".tsv") {
            delimiters.retain(|d| *d != b'\t');
            delimiters.insert(0, b'\t');
        }
        plan.extend(
            delimiters
                .into_iter()
                .map(|delimiter| LoadStrategy::Delimited { delimiter, multi_column: true }),
        );
        plan.push(LoadStrategy::Delimited { delimiter: b',', multi_column: false });
        plan
    }

    pub fn name(&self) -> String {
        match self {
            LoadStrategy::Xlsx => "xlsx".to_string(),
            LoadStrategy::Xls => "xls".to_string(),
            LoadStrategy::WorkbookSniff => "workbook_sniff".to_string(),
            LoadStrategy::Delimited { delimiter, multi_column } => {
                let sep = match delimiter {
                    b'\t' => "tab".to_string(),
                    other => (*other as char).to_string(),
                };
                if *multi_column {
                    format!("delimited[{}]", sep)
                } else {
                    format!("delimited[{}],single", sep)
                }
            }
        }
    }

    fn attempt(&self, bytes: &[u8]) -> Result<Table, String> {
        match self {
            LoadStrategy::Xlsx => {
                let workbook = open_workbook_from_rs::<Xlsx<_>, _>(Cursor::new(bytes.to_vec()))
                    .map_err(|e| e.to_string())?;
                first_sheet(workbook)
            }
            LoadStrategy::Xls => {
                let workbook = open_workbook_from_rs::<Xls<_>, _>(Cursor::new(bytes.to_vec()))
                    .map_err(|e| e.to_string())?;
                first_sheet(workbook)
            }
            LoadStrategy::WorkbookSniff => {
                let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
                    .map_err(|e| e.to_string())?;
                first_sheet(workbook)
            }
            LoadStrategy::Delimited { delimiter, multi_column } => {
                read_delimited(bytes, *delimiter, *multi_column)
            }
        }
    }
}

/// Parse tabular bytes, trying each strategy in order. First success wins;
/// `None` when every attempt fails.
pub fn load_table(bytes: &[u8], name_hint: &str) -> Option<Table> {
    let fingerprint = hex::encode(Sha256::digest(bytes));
    if bytes.is_empty() {
        warn!(source = name_hint, "Source is empty");
        metrics::loader::unreadable();
        return None;
    }

    for strategy in LoadStrategy::plan(name_hint) {
        match strategy.attempt(bytes) {
            Ok(table) => {
                metrics::loader::attempt(&strategy.name(), "success");
                metrics::loader::loaded(bytes.len());
                info!(
                    source = name_hint,
                    strategy = %strategy.name(),
                    sha256 = %fingerprint,
                    rows = table.len(),
                    columns = table.columns().len(),
                    "Loaded table"
                );
                return Some(table);
            }
            Err(reason) => {
                metrics::loader::attempt(&strategy.name(), "failure");
                debug!(source = name_hint, strategy = %strategy.name(), reason = %reason, "Parse attempt failed");
            }
        }
    }

    warn!(source = name_hint, sha256 = %fingerprint, "No parser could read source");
    metrics::loader::unreadable();
    None
}

fn first_sheet<RS, R>(mut workbook: R) -> Result<Table, String>
where
    RS: Read + Seek,
    R: Reader<RS>,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no sheets".to_string())?
        .map_err(|e| format!("{:?}", e))?;
    range_to_table(&range)
}

fn range_to_table(range: &Range<Data>) -> Result<Table, String> {
    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| "sheet is empty".to_string())?;
    let headers: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| cell_value(cell).unwrap_or_else(|| unnamed(idx)))
        .collect();

    let body: Vec<Row> = rows
        .map(|row| row.iter().map(cell_value).collect::<Row>())
        .filter(|row| row.iter().any(Option::is_some))
        .collect();

    Ok(Table::from_raw(headers, body))
}

/// Text form of a workbook cell. Whole floats drop their `.0` so parcel
/// numbers and zips stored as numbers read back as typed.
fn cell_value(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(_) => cell.as_datetime().map(|dt| dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

fn unnamed(idx: usize) -> String {
    format!("Unnamed: {}", idx)
}

fn read_delimited(bytes: &[u8], delimiter: u8, multi_column: bool) -> Result<Table, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("not UTF-8: {}", e))?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .enumerate()
        .map(|(idx, h)| if h.is_empty() { unnamed(idx) } else { h.to_string() })
        .collect();

    if headers.is_empty() {
        return Err("no header row".to_string());
    }
    if multi_column && headers.len() < 2 {
        return Err("header did not split into columns".to_string());
    }

    let width = headers.len();
    let mut rows: Vec<Row> = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() > width {
            skipped += 1;
            continue;
        }
        let row: Row = record
            .iter()
            .map(|field| if field.is_empty() { None } else { Some(field.to_string()) })
            .collect();
        if row.iter().any(Option::is_some) {
            rows.push(row);
        }
    }
    if skipped > 0 {
        debug!(skipped, "Skipped rows with more fields than the header");
    }

    Ok(Table::from_raw(headers, rows))
}
