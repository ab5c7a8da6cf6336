use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::constants::{self, SECONDARY_PARCEL_HEADERS};
use crate::observability::metrics;
use crate::types::{Row, Table};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("static regex"));

/// Join key for a parcel number: non-word characters removed, lowercased.
pub fn apn_key(apn: &str) -> String {
    NON_WORD.replace_all(apn, "").to_lowercase()
}

/// Left-join `secondary` onto `base` by parcel number.
///
/// Every base row survives. A base row whose key matches several secondary
/// rows is emitted once per match. Blank keys join like any other key.
/// Secondary columns whose name already exists in `base` get `suffix` appended.
pub fn merge_on_apn(base: Table, secondary: Option<&Table>, suffix: &str) -> Table {
    let Some(secondary) = secondary.filter(|t| !t.is_empty()) else {
        debug!(suffix = suffix, "No secondary rows; merge skipped");
        return base;
    };

    let mut base = base;
    base.drop_column(constants::APN_KEY);
    let mut secondary = secondary.clone();
    secondary.drop_column(constants::APN_KEY);

    match SECONDARY_PARCEL_HEADERS.iter().find(|h| secondary.has_column(h)) {
        Some(header) => {
            secondary.rename_column(header, constants::APN);
        }
        None => {
            warn!(suffix = suffix, "Secondary export has no parcel column; only blank parcels will match");
            secondary.add_column(constants::APN, Some(String::new()));
        }
    }

    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..secondary.len() {
        let key = apn_key(secondary.text(row, constants::APN));
        index.entry(key).or_default().push(row);
    }

    let (base_columns, base_rows) = base.into_parts();
    let (secondary_columns, secondary_rows) = secondary.into_parts();
    let base_apn = base_columns.iter().position(|c| c == constants::APN);

    let mut columns = base_columns.clone();
    for name in &secondary_columns {
        let mut resolved = name.clone();
        while columns.contains(&resolved) {
            resolved.push_str(suffix);
        }
        columns.push(resolved);
    }

    let width = secondary_columns.len();
    let mut rows: Vec<Row> = Vec::with_capacity(base_rows.len());
    let mut matched = 0usize;
    for base_row in base_rows {
        let key = base_apn
            .and_then(|idx| base_row[idx].as_deref())
            .map(apn_key)
            .unwrap_or_default();

        match index.get(&key) {
            Some(hits) => {
                matched += 1;
                for &hit in hits {
                    let mut row = base_row.clone();
                    row.extend(secondary_rows[hit].iter().cloned());
                    rows.push(row);
                }
            }
            None => {
                let mut row = base_row;
                row.extend(std::iter::repeat(None).take(width));
                rows.push(row);
            }
        }
    }

    let merged = Table::from_raw(columns, rows);
    info!(
        suffix = suffix,
        secondary_rows = secondary_rows.len(),
        matched_base_rows = matched,
        rows_out = merged.len(),
        "Merged secondary export"
    );
    metrics::merge::matched(suffix, matched as u64);
    merged
}
