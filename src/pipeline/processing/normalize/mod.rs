use std::collections::HashMap;

use tracing::{debug, warn};

use crate::constants::{self, CANONICAL_FIELDS, COLUMN_ALIASES};
use crate::types::Table;

/// Characters removed from a parcel number before comparison.
const APN_STRIP_CHARS: [char; 5] = [' ', '-', '_', '/', '.'];

/// Trait for canonicalizing a raw lead table
pub trait Normalizer {
    /// Rename known columns, backfill missing canonical fields and derive
    /// `APN_norm` / `addr_query`. Never drops or reorders rows.
    fn normalize(&self, table: Table) -> Table;
}

/// Normalizer driven by the case-insensitive alias table in `constants`.
pub struct DefaultNormalizer {
    /// lowercase alias -> canonical column name
    aliases: HashMap<&'static str, &'static str>,
}

impl Default for DefaultNormalizer {
    fn default() -> Self {
        let aliases = COLUMN_ALIASES
            .iter()
            .flat_map(|(canonical, names)| names.iter().map(move |alias| (*alias, *canonical)))
            .collect();
        Self { aliases }
    }
}

impl DefaultNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical target for a raw header, if any.
    fn canonical_for(&self, raw: &str) -> Option<&'static str> {
        self.aliases.get(raw.trim().to_lowercase().as_str()).copied()
    }

    /// Work out which raw column claims each canonical name.
    ///
    /// A column already named exactly like the canonical field claims it first;
    /// otherwise the first aliased column in source order wins. Later aliases of
    /// a claimed target keep their raw name.
    fn plan_renames(&self, columns: &[String]) -> Vec<(String, &'static str)> {
        let mut claimed: HashMap<&'static str, String> = HashMap::new();

        for column in columns {
            if let Some(canonical) = CANONICAL_FIELDS.iter().find(|c| **c == column.as_str()) {
                claimed.insert(*canonical, column.clone());
            }
        }

        let mut renames = Vec::new();
        for column in columns {
            let Some(canonical) = self.canonical_for(column) else {
                continue;
            };
            match claimed.get(canonical) {
                Some(owner) if owner == column => {}
                Some(owner) => {
                    warn!(
                        column = %column,
                        canonical = canonical,
                        kept = %owner,
                        "Duplicate alias for canonical column; keeping raw name"
                    );
                }
                None => {
                    claimed.insert(canonical, column.clone());
                    renames.push((column.clone(), canonical));
                }
            }
        }
        renames
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, mut table: Table) -> Table {
        for (from, to) in self.plan_renames(table.columns()) {
            debug!(from = %from, to = to, "Renaming column");
            table.rename_column(&from, to);
        }

        for field in CANONICAL_FIELDS {
            if !table.has_column(field) {
                debug!(field = field, "Backfilling missing canonical column");
                table.add_column(field, Some(String::new()));
            }
        }

        let apn_norm = (0..table.len())
            .map(|row| Some(normalize_apn(table.get(row, constants::APN))))
            .collect();
        table.set_column(constants::APN_NORM, apn_norm);

        let queries = (0..table.len())
            .map(|row| {
                Some(addr_query(
                    table.text(row, constants::PROPERTY_ADDRESS),
                    table.text(row, constants::CITY),
                    table.text(row, constants::STATE),
                    table.text(row, constants::ZIP),
                ))
            })
            .collect();
        table.set_column(constants::ADDR_QUERY, queries);

        table
    }
}

/// Lowercased parcel number with spaces, hyphens, underscores, slashes and periods removed.
pub fn normalize_apn(apn: Option<&str>) -> String {
    apn.unwrap_or("")
        .trim()
        .chars()
        .filter(|c| !APN_STRIP_CHARS.contains(c))
        .collect::<String>()
        .to_lowercase()
}

/// Space-joined address search text, skipping blank components.
pub fn addr_query(address: &str, city: &str, state: &str, zip: &str) -> String {
    [address, city, state, zip]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_apn_strips_punctuation() {
        assert_eq!(normalize_apn(Some("123-45 / 6.7_8")), "12345678");
        assert_eq!(normalize_apn(Some("  AB-12 ")), "ab12");
        assert_eq!(normalize_apn(None), "");
    }

    #[test]
    fn test_addr_query_skips_empty_parts() {
        assert_eq!(addr_query("100 Main St", "", "CA", "90210"), "100 Main St CA 90210");
        assert_eq!(addr_query(" 1 Elm ", "  ", "", "  62701"), "1 Elm 62701");
        assert_eq!(addr_query("", "", "", ""), "");
    }

    #[test]
    fn test_aliases_are_renamed_case_insensitively() {
        let table = Table::from_strings(
            &["PARCEL NUMBER", "Site Address", "Town", "st", "ZipCode", "county_name", "Owner"],
            &[&["1-2", "5 Oak", "Reno", "NV", "89501", "Washoe", "Jane"]],
        );
        let out = DefaultNormalizer::new().normalize(table);

        assert_eq!(out.text(0, "APN"), "1-2");
        assert_eq!(out.text(0, "Property Address"), "5 Oak");
        assert_eq!(out.text(0, "City"), "Reno");
        assert_eq!(out.text(0, "State"), "NV");
        assert_eq!(out.text(0, "Zip"), "89501");
        assert_eq!(out.text(0, "County Finder"), "Washoe");
        assert_eq!(out.text(0, "Owner"), "Jane");
        assert_eq!(out.text(0, "APN_norm"), "12");
        assert_eq!(out.text(0, "addr_query"), "5 Oak Reno NV 89501");
    }

    #[test]
    fn test_missing_canonical_fields_are_backfilled() {
        let table = Table::from_strings(&["Owner"], &[&["Jane"], &["Joe"]]);
        let out = DefaultNormalizer::new().normalize(table);

        for field in CANONICAL_FIELDS {
            assert!(out.has_column(field), "missing {}", field);
            assert_eq!(out.get(1, field), Some(""));
        }
        assert_eq!(out.text(0, "APN_norm"), "");
        assert_eq!(out.text(0, "addr_query"), "");
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_first_alias_wins_and_exact_name_has_priority() {
        let table = Table::from_strings(&["Parcel", "APN", "apn_extra"], &[&["P-1", "A-1", "x"]]);
        let out = DefaultNormalizer::new().normalize(table);

        assert_eq!(out.text(0, "APN"), "A-1");
        assert_eq!(out.text(0, "Parcel"), "P-1");

        let table = Table::from_strings(&["parcel", "Parcel Number"], &[&["P-1", "P-2"]]);
        let out = DefaultNormalizer::new().normalize(table);
        assert_eq!(out.text(0, "APN"), "P-1");
        assert_eq!(out.text(0, "Parcel Number"), "P-2");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let table = Table::from_strings(
            &["Parcel", "Address", "City", "State", "Zip"],
            &[&["12-345", "1 Elm St", "Springfield", "IL", "62701"]],
        );
        let normalizer = DefaultNormalizer::new();
        let once = normalizer.normalize(table);
        let twice = normalizer.normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_apn_cell_normalizes_to_empty() {
        let table = Table::from_raw(vec!["APN".into()], vec![vec![None]]);
        let out = DefaultNormalizer::new().normalize(table);
        assert_eq!(out.get(0, "APN_norm"), Some(""));
    }
}
