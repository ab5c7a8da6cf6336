use serde::{Deserialize, Serialize};

use crate::constants;

/// One table row, aligned with `Table::columns`. `None` is a missing cell.
pub type Row = Vec<Option<String>>;

/// An ordered table with a dynamic, uniquely named column set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from raw headers and rows.
    ///
    /// Repeated header names get `.1`, `.2`, ... appended so every column can
    /// be addressed by name. Short rows are padded with missing cells and long
    /// rows are truncated to the header width.
    pub fn from_raw(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(headers.len());
        for header in headers {
            let mut candidate = header.clone();
            let mut n = 1;
            while columns.contains(&candidate) {
                candidate = format!("{}.{}", header, n);
                n += 1;
            }
            columns.push(candidate);
        }

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Convenience constructor for fully populated string rows.
    pub fn from_strings(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::from_raw(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell value, `None` when the column is absent or the cell is missing.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Cell value coerced to text; absent and missing both read as `""`.
    pub fn text(&self, row: usize, column: &str) -> &str {
        self.get(row, column).unwrap_or("")
    }

    /// Rename a column in place. Returns false if `from` does not exist.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace the column's values if it exists, otherwise append it.
    pub fn set_column(&mut self, name: &str, values: Vec<Option<String>>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Append a column holding the same value on every row, unless it already exists.
    pub fn add_column(&mut self, name: &str, fill: Option<String>) {
        if self.has_column(name) {
            return;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Column-concatenate `other` onto this table. Row counts must match;
    /// columns already present are overwritten.
    pub fn append_columns(&mut self, other: Table) {
        debug_assert_eq!(self.len(), other.len());
        let Table { columns, rows } = other;
        let mut by_column: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for row in rows {
            for (idx, value) in row.into_iter().enumerate() {
                by_column[idx].push(value);
            }
        }
        for (name, values) in columns.iter().zip(by_column) {
            self.set_column(name, values);
        }
    }

    /// First non-missing value in a column, used for the column dictionary.
    pub fn first_value(&self, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.iter().find_map(|row| row[idx].as_deref())
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }
}

/// The canonical and derived fields of one normalized lead row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLead {
    pub apn: String,
    pub property_address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub county_finder: String,
    pub apn_norm: String,
    pub addr_query: String,
}

impl CanonicalLead {
    pub fn from_row(table: &Table, row: usize) -> Self {
        Self {
            apn: table.text(row, constants::APN).to_string(),
            property_address: table.text(row, constants::PROPERTY_ADDRESS).to_string(),
            city: table.text(row, constants::CITY).to_string(),
            state: table.text(row, constants::STATE).to_string(),
            zip: table.text(row, constants::ZIP).to_string(),
            county_finder: table.text(row, constants::COUNTY_FINDER).to_string(),
            apn_norm: table.text(row, constants::APN_NORM).to_string(),
            addr_query: table.text(row, constants::ADDR_QUERY).to_string(),
        }
    }
}
