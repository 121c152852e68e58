//! Data normalization
//!
//! Converts heterogeneous CSV rows (varying headers, casing, delimiters and date
//! formats) into rows keyed by canonical field names. Normalization never fails:
//! values that cannot be coerced are kept as cleaned strings and validated later
//! by the record upserter.

pub mod csv;
pub mod fields;
pub mod header;
pub mod value;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use self::csv::{CsvError, RawRow, parse_csv, trains_to_csv};
pub use header::{HEADER_RULES, HeaderRule, canonical_header, reduce_header};

/// One CSV row keyed by canonical field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    /// Zero-based position of the row in its source file
    #[serde(rename = "_rowOrder")]
    pub row_index: usize,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl NormalizedRow {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            fields: BTreeMap::new(),
        }
    }

    /// Value of a field, if present and non-empty
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    /// True if any of `signals` carries a non-empty value
    pub fn has_any(&self, signals: &[&str]) -> bool {
        signals.iter().any(|f| self.get(f).is_some())
    }

    /// A row is usable only if it resolves both train identity fields
    pub fn has_train_identity(&self) -> bool {
        self.get(fields::TRAIN_ID).is_some() && self.get(fields::TRAIN_NAME).is_some()
    }
}

/// Normalize one raw row
///
/// Later columns that resolve to the same canonical name overwrite earlier ones.
pub fn normalize_row(raw: &RawRow, row_index: usize) -> NormalizedRow {
    let mut row = NormalizedRow::new(row_index);

    for (header, value) in raw {
        row.insert(canonical_header(header), value::clean_value(value));
    }

    for field in fields::BOOLEAN_FIELDS {
        if let Some(parsed) = row.get(field).and_then(value::parse_bool) {
            row.insert(*field, parsed.to_string());
        }
    }

    for field in fields::DATE_FIELDS {
        if let Some(parsed) = row.get(field).and_then(value::parse_date_flexible) {
            row.insert(*field, value::format_timestamp(&parsed));
        }
    }

    if row.get(fields::TRAIN_NAME).is_some() && row.get(fields::TRAIN_ID).is_none() {
        if let Some(id) = row.get("trainid").map(str::to_string) {
            row.insert(fields::TRAIN_ID, id);
        }
    }

    row
}

/// Normalize every row, preserving source order
pub fn normalize_rows(raw: &[RawRow]) -> Vec<NormalizedRow> {
    raw.iter()
        .enumerate()
        .map(|(i, r)| normalize_row(r, i))
        .collect()
}
