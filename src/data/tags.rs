use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::encoding::{read_text, TextEncoding};
use crate::data::ordered::{deserialize_entries, serialize_entries};
use crate::error::{CurateError, Result};

pub const DEFAULT_TAGS_FILE: &str = "tags.json";
pub const DEFAULT_FIRST_ROW: usize = 5;
pub const DEFAULT_LAST_ROW: usize = 21;

/// Half-open, 0-based range of source lines to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub first: usize,
    pub last: usize,
}

impl Default for RowRange {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST_ROW,
            last: DEFAULT_LAST_ROW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub key: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTable {
    entries: Vec<TagEntry>,
}

impl TagTable {
    /// Build from `(key, aliases)` pairs in position order. Keys must be unique and
    /// every position needs at least one alias.
    pub fn from_entries<I, K, A>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Vec<A>)>,
        K: Into<String>,
        A: Into<String>,
    {
        let mut table = TagTable::default();
        for (position, (key, aliases)) in entries.into_iter().enumerate() {
            let aliases: Vec<String> = aliases.into_iter().map(Into::into).collect();
            let key = key.into();
            if aliases.is_empty() {
                return Err(CurateError::EmptyAliases { tag: key });
            }
            table.push(key, aliases, position + 1)?;
        }
        Ok(table)
    }

    /// Parse the selected rows of an already-decoded source table.
    pub fn parse(text: &str, range: RowRange) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let last = range.last.min(lines.len());
        if last < range.last {
            warn!(
                requested = range.last,
                available = lines.len(),
                "row range extends past end of source, clamping"
            );
        }
        if range.first >= last {
            return Err(CurateError::EmptyTagTable {
                first: range.first,
                last: range.last,
            });
        }

        let mut table = TagTable::default();
        for (offset, line) in lines[range.first..last].iter().enumerate() {
            let line_no = range.first + offset + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 3 {
                return Err(CurateError::MalformedRow {
                    line: line_no,
                    found: tokens.len(),
                });
            }
            let aliases = tokens[2..].iter().map(|s| s.to_string()).collect();
            table.push(tokens[1].to_string(), aliases, line_no)?;
        }
        debug!(positions = table.len(), "parsed tag table");
        Ok(table)
    }

    /// Read and parse a tag-table export from disk.
    pub fn from_source(path: impl AsRef<Path>, encoding: TextEncoding, range: RowRange) -> Result<Self> {
        let text = read_text(path, encoding)?;
        Self::parse(&text, range)
    }

    /// Load a previously dumped `tags.json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| CurateError::io(path, err))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write `tags.json` into `dir`, creating it if needed. Returns the written path.
    pub fn dump(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|err| CurateError::io(dir, err))?;
        let path = dir.join(DEFAULT_TAGS_FILE);
        fs::write(&path, serde_json::to_string(self)?).map_err(|err| CurateError::io(&path, err))?;
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TagEntry] {
        &self.entries
    }

    /// Canonical tag key at a 0-based position.
    pub fn key(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(|e| e.key.as_str())
    }

    pub fn aliases(&self, position: usize) -> Option<&[String]> {
        self.entries.get(position).map(|e| e.aliases.as_slice())
    }

    /// Tag keys in position order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    fn push(&mut self, key: String, aliases: Vec<String>, line: usize) -> Result<()> {
        if self.entries.iter().any(|e| e.key == key) {
            return Err(CurateError::DuplicateTag { tag: key, line });
        }
        self.entries.push(TagEntry { key, aliases });
        Ok(())
    }
}

impl Serialize for TagTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries: Vec<(String, &Vec<String>)> = self
            .entries
            .iter()
            .map(|e| (e.key.clone(), &e.aliases))
            .collect();
        serialize_entries(&entries, serializer)
    }
}

impl<'de> Deserialize<'de> for TagTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries: Vec<(String, Vec<String>)> = deserialize_entries(deserializer)?;
        TagTable::from_entries(entries).map_err(de::Error::custom)
    }
}
