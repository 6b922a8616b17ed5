//! Taxonomy catalog keyed by `"{index}-{pivot}"` (or the pivot alone).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::data::encoding::{read_text, TextEncoding};
use crate::data::ordered::{deserialize_entries, serialize_entries};
use crate::error::{CurateError, Result};
use crate::naming::filename::stem_fragments;

pub const DEFAULT_TAXONOMY_FILE: &str = "taxonomy.json";
pub const DEFAULT_PIVOT: &str = "txID";
pub const NOT_FOUND_TEXT: &str = "Not found in the taxonomy.";

pub const INDEX_FIELD: &str = "index";
pub const TX_ID_FIELD: &str = "txID";
pub const NAME_SEQ_FIELD: &str = "nameSeq";

/// One taxonomy row: column name -> value, in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyRecord {
    fields: Vec<(String, Value)>,
}

impl TaxonomyRecord {
    /// Set a field, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// 1-based sequence position of the source table this record came from.
    pub fn index(&self) -> Option<u64> {
        self.get(INDEX_FIELD).and_then(Value::as_u64)
    }

    pub fn tx_id(&self) -> Option<&str> {
        self.get(TX_ID_FIELD).and_then(Value::as_str)
    }

    pub fn name_seq(&self) -> Option<u64> {
        self.get(NAME_SEQ_FIELD).and_then(Value::as_u64)
    }

    /// Field rendered as text; strings verbatim, numbers and bools via JSON, null as None.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl Serialize for TaxonomyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_entries(&self.fields, serializer)
    }
}

impl<'de> Deserialize<'de> for TaxonomyRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(TaxonomyRecord {
            fields: deserialize_entries(deserializer)?,
        })
    }
}

/// How to read the per-tag source tables.
#[derive(Debug, Clone)]
pub struct TaxonomySource {
    /// Tag identifiers, in filename position order; `<prefix><tag>.csv` per entry.
    pub tags: Vec<String>,
    /// Column names for the headerless tables.
    pub names: Vec<String>,
    pub pivot: String,
    pub prefix: String,
    /// Key records as `"{index}-{pivot}"` instead of the bare pivot value.
    pub positional: bool,
    pub encoding: TextEncoding,
}

#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    entries: Vec<(String, TaxonomyRecord)>,
    by_key: HashMap<String, usize>,
}

impl Taxonomy {
    pub fn from_entries(entries: Vec<(String, TaxonomyRecord)>) -> Self {
        let mut taxonomy = Taxonomy::default();
        for (key, record) in entries {
            taxonomy.insert(key, record);
        }
        taxonomy
    }

    /// Build from one headerless CSV per tag.
    pub fn from_tag_tables(dir: impl AsRef<Path>, source: &TaxonomySource) -> Result<Self> {
        let dir = dir.as_ref();
        let pivot_col = source
            .names
            .iter()
            .position(|n| *n == source.pivot)
            .ok_or_else(|| CurateError::MissingColumn {
                pivot: source.pivot.clone(),
                columns: source.names.clone(),
            })?;

        let mut taxonomy = Taxonomy::default();
        for (index, tag) in (1u64..).zip(&source.tags) {
            let path = dir.join(format!("{}{}.csv", source.prefix, tag));
            let text = read_text(&path, source.encoding)?;
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(text.as_bytes());

            let mut rows = 0usize;
            for result in reader.records() {
                let row = result?;
                let pivot = row.get(pivot_col).unwrap_or("").to_string();
                let key = if source.positional {
                    format!("{index}-{pivot}")
                } else {
                    pivot.clone()
                };

                let mut record = TaxonomyRecord::default().with(INDEX_FIELD, Value::from(index));
                for (col, name) in source.names.iter().enumerate() {
                    let value = if col == pivot_col {
                        Value::String(pivot.clone())
                    } else {
                        row.get(col).map(infer_cell).unwrap_or(Value::Null)
                    };
                    record.insert(name.as_str(), value);
                }
                taxonomy.insert_logged(key, record);
                rows += 1;
            }
            debug!(tag = %tag, index, rows, path = %path.display(), "read taxonomy table");
        }
        Ok(taxonomy)
    }

    /// Build from a single CSV whose first row names the columns.
    pub fn from_headed_table(path: impl AsRef<Path>, pivot: &str, encoding: TextEncoding) -> Result<Self> {
        let text = read_text(path.as_ref(), encoding)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let pivot_col = header
            .iter()
            .position(|h| h == pivot)
            .ok_or_else(|| CurateError::MissingColumn {
                pivot: pivot.to_string(),
                columns: header.clone(),
            })?;

        let mut taxonomy = Taxonomy::default();
        for result in reader.records() {
            let row = result?;
            let key = row.get(pivot_col).unwrap_or("").to_string();
            let mut record = TaxonomyRecord::default();
            for (col, name) in header.iter().enumerate() {
                let value = if col == pivot_col {
                    Value::String(key.clone())
                } else {
                    row.get(col).map(infer_cell).unwrap_or(Value::Null)
                };
                record.insert(name.as_str(), value);
            }
            taxonomy.insert_logged(key, record);
        }
        Ok(taxonomy)
    }

    /// Add the "not relevant" (`{i:02}00-nr`) and "not applicable" (`{i:02}99-na`)
    /// fallbacks for every name position `1..=positions` that lacks them.
    /// Returns how many records were added.
    pub fn fill_gaps(&mut self, positions: usize) -> usize {
        let mut added = 0;
        for seq in 1..=positions {
            for key in [format!("{seq:02}00-nr"), format!("{seq:02}99-na")] {
                if self.contains_key(&key) {
                    continue;
                }
                let record = TaxonomyRecord::default()
                    .with(NAME_SEQ_FIELD, Value::from(seq as u64))
                    .with(TX_ID_FIELD, Value::String(key.clone()));
                self.insert(key, record);
                added += 1;
            }
        }
        added
    }

    /// Insert or replace. Replacement keeps the key's original position.
    pub fn insert(&mut self, key: String, record: TaxonomyRecord) -> Option<TaxonomyRecord> {
        match self.by_key.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, record)),
            None => {
                self.by_key.insert(key.clone(), self.entries.len());
                self.entries.push((key, record));
                None
            }
        }
    }

    fn insert_logged(&mut self, key: String, record: TaxonomyRecord) {
        let shown = key.clone();
        if self.insert(key, record).is_some() {
            warn!(key = %shown, "duplicate taxonomy key, later row replaces earlier one");
        }
    }

    pub fn get(&self, key: &str) -> Option<&TaxonomyRecord> {
        self.by_key.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaxonomyRecord)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Records whose `criteria` field equals one of `selection`.
    pub fn filter<'a>(&'a self, criteria: &str, selection: &[Value]) -> Vec<(&'a str, &'a TaxonomyRecord)> {
        self.iter()
            .filter(|(_, record)| record.get(criteria).is_some_and(|v| selection.contains(v)))
            .collect()
    }

    /// Text of `field` for `tag`, if both exist.
    pub fn text_for(&self, tag: &str, field: &str) -> Option<String> {
        self.get(tag)?.text(field)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| CurateError::io(path, err))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn dump(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| CurateError::io(parent, err))?;
        }
        fs::write(path, serde_json::to_string(self)?).map_err(|err| CurateError::io(path, err))
    }
}

impl Serialize for Taxonomy {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_entries(&self.entries, serializer)
    }
}

impl<'de> Deserialize<'de> for Taxonomy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Taxonomy::from_entries(deserialize_entries(deserializer)?))
    }
}

/// One column of a headerless CSV, e.g. the declared tag names.
pub fn read_column(path: impl AsRef<Path>, encoding: TextEncoding, index: usize) -> Result<Vec<String>> {
    let text = read_text(path, encoding)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut column = Vec::new();
    for result in reader.records() {
        column.push(result?.get(index).unwrap_or("").trim().to_string());
    }
    Ok(column)
}

/// The `index`-th `_` fragment of a file's stem.
pub fn tag_from_filename(path: impl AsRef<Path>, index: usize) -> Option<String> {
    let name = path.as_ref().file_name()?.to_str()?;
    stem_fragments(name).get(index).map(|s| s.to_string())
}

fn infer_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if has_leading_zero(trimmed) {
        return Value::String(raw.to_string());
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// `007` or `-01`, but not `0` or `0.5`: codes whose zeros would be lost as numbers.
fn has_leading_zero(cell: &str) -> bool {
    let digits = cell.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(cell);
    let mut chars = digits.chars();
    chars.next() == Some('0') && chars.next().is_some_and(|c| c.is_ascii_digit())
}
