//! Fragments are matched by their last three characters; a miss yields [`SENTINEL`].

use std::fmt;
use std::fs;
use std::path::Path;

use serde::ser::{Serialize, Serializer};
use tracing::trace;

use crate::data::ordered::serialize_entries;
use crate::data::tags::TagTable;
use crate::error::{CurateError, Result};
use crate::naming::filename::{split_name, stem_fragments};

/// Placeholder for a fragment that could not be resolved.
pub const SENTINEL: &str = "00-n";
/// Number of trailing characters used to match a fragment to an alias.
pub const SUFFIX_LEN: usize = 3;
pub const DEFAULT_CORRECTIONS_FILE: &str = "corrections.json";

/// Last [`SUFFIX_LEN`] characters of `s`, or all of it when shorter.
pub fn suffix_key(s: &str) -> &str {
    let start = s
        .char_indices()
        .rev()
        .nth(SUFFIX_LEN - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

/// Suffix -> canonical alias for one tag. A later alias with the same suffix replaces
/// the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixMap {
    entries: Vec<(String, String)>,
}

impl SuffixMap {
    fn from_aliases(aliases: &[String]) -> Self {
        let mut map = SuffixMap::default();
        for alias in aliases {
            let suffix = suffix_key(alias);
            match map.entries.iter_mut().find(|(s, _)| s == suffix) {
                Some((_, slot)) => *slot = alias.clone(),
                None => map.entries.push((suffix.to_string(), alias.clone())),
            }
        }
        map
    }

    pub fn get(&self, suffix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == suffix)
            .map(|(_, alias)| alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SuffixMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_entries(&self.entries, serializer)
    }
}

/// Per-tag suffix maps, in tag table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionMap {
    tags: Vec<(String, SuffixMap)>,
}

impl CorrectionMap {
    pub fn from_tags(table: &TagTable) -> Self {
        CorrectionMap {
            tags: table
                .entries()
                .iter()
                .map(|e| (e.key.clone(), SuffixMap::from_aliases(&e.aliases)))
                .collect(),
        }
    }

    pub fn for_tag(&self, tag: &str) -> Option<&SuffixMap> {
        self.tags.iter().find(|(t, _)| t == tag).map(|(_, m)| m)
    }

    /// Canonical alias for `fragment` at `tag`, matched on the fragment's suffix.
    pub fn resolve(&self, tag: &str, fragment: &str) -> Option<&str> {
        self.for_tag(tag)?.get(suffix_key(fragment))
    }

    pub fn dump(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| CurateError::io(parent, err))?;
        }
        fs::write(path, serde_json::to_string(self)?).map_err(|err| CurateError::io(path, err))
    }
}

impl Serialize for CorrectionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_entries(&self.tags, serializer)
    }
}

/// One position of a validated filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTag {
    /// 0-based position in the filename.
    pub position: usize,
    pub tag: Option<String>,
    pub raw: Option<String>,
    pub value: String,
    pub resolved: bool,
}

impl fmt::Display for ResolvedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub original: String,
    pub corrected: String,
    pub unchanged: bool,
    pub tags: Vec<ResolvedTag>,
}

impl ValidationOutcome {
    /// Positions that fell back to the sentinel.
    pub fn unresolved_count(&self) -> usize {
        self.tags.iter().filter(|t| !t.resolved).count()
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved_count() == 0
    }
}

/// Tag table plus its derived correction map; read-only for the run.
#[derive(Debug, Clone)]
pub struct Corrector {
    table: TagTable,
    corrections: CorrectionMap,
}

impl Corrector {
    pub fn new(table: TagTable) -> Self {
        let corrections = CorrectionMap::from_tags(&table);
        Corrector { table, corrections }
    }

    pub fn table(&self) -> &TagTable {
        &self.table
    }

    pub fn corrections(&self) -> &CorrectionMap {
        &self.corrections
    }

    /// Validate a bare file name (no directory part).
    pub fn validate(&self, filename: &str) -> ValidationOutcome {
        let (_, extension) = split_name(filename);
        let fragments = stem_fragments(filename);

        let tags: Vec<ResolvedTag> = (0..self.table.len())
            .map(|position| self.resolve(position, fragments.get(position).copied()))
            .collect();

        let stem = tags
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join("_");
        let corrected = format!("{stem}{extension}");

        ValidationOutcome {
            unchanged: filename == corrected,
            original: filename.to_string(),
            corrected,
            tags,
        }
    }

    /// Corrected file name only.
    pub fn correct(&self, filename: &str) -> String {
        self.validate(filename).corrected
    }

    fn resolve(&self, position: usize, fragment: Option<&str>) -> ResolvedTag {
        let tag = self.table.key(position);
        let value = match (tag, fragment) {
            (Some(tag), Some(fragment)) => self.corrections.resolve(tag, fragment),
            _ => None,
        };
        trace!(position, ?tag, ?fragment, ?value, "resolved fragment");
        ResolvedTag {
            position,
            tag: tag.map(str::to_string),
            raw: fragment.map(str::to_string),
            resolved: value.is_some(),
            value: value.unwrap_or(SENTINEL).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector() -> Corrector {
        let table = TagTable::from_entries(vec![
            ("mode", vec!["01-car", "02-bus", "03-bik"]),
            ("calc", vec!["01-sng", "02-uni", "03-rep"]),
            ("route", vec!["01-frt-1001", "02-frt-1002", "06-frt-1006"]),
        ])
        .unwrap();
        Corrector::new(table)
    }

    #[test]
    fn suffix_key_counts_characters() {
        assert_eq!(suffix_key("01-frt-1001"), "001");
        assert_eq!(suffix_key("ab"), "ab");
        assert_eq!(suffix_key(""), "");
        assert_eq!(suffix_key("zoné"), "oné");
    }

    #[test]
    fn canonical_name_is_a_fixed_point() {
        let c = corrector();
        let outcome = c.validate("01-car_02-uni_06-frt-1006.csv");
        assert!(outcome.unchanged);
        assert!(outcome.is_fully_resolved());
        assert_eq!(outcome.corrected, "01-car_02-uni_06-frt-1006.csv");
    }

    #[test]
    fn fragments_are_corrected_by_suffix() {
        let c = corrector();
        let outcome = c.validate("car_uni_route-1002.csv");
        assert_eq!(outcome.corrected, "01-car_02-uni_02-frt-1002.csv");
        assert!(!outcome.unchanged);
        assert_eq!(outcome.tags[2].raw.as_deref(), Some("route-1002"));
    }

    #[test]
    fn unknown_suffix_becomes_sentinel() {
        let c = corrector();
        let outcome = c.validate("01-car_02-uni_frt-1001-6.csv");
        assert_eq!(outcome.corrected, "01-car_02-uni_00-n.csv");
        assert_eq!(outcome.unresolved_count(), 1);
        assert_eq!(outcome.tags[2].to_string(), SENTINEL);
    }

    #[test]
    fn missing_fragments_become_sentinels() {
        let c = corrector();
        assert_eq!(c.correct("01-car.csv"), "01-car_00-n_00-n.csv");
    }

    #[test]
    fn unrecognized_name_is_all_sentinels() {
        let c = corrector();
        let outcome = c.validate("xyz_qqq.txt");
        assert_eq!(outcome.corrected, "00-n_00-n_00-n.txt");
        assert_eq!(outcome.unresolved_count(), 3);
        assert!(!outcome.is_fully_resolved());
    }

    #[test]
    fn extra_fragments_are_dropped() {
        let c = corrector();
        assert_eq!(
            c.correct("01-car_02-uni_01-frt-1001_extra.csv"),
            "01-car_02-uni_01-frt-1001.csv"
        );
    }

    #[test]
    fn correction_is_idempotent() {
        let c = corrector();
        for name in ["car_uni_x-1001.csv", "bogus.csv", "03-bik__01-frt-1001"] {
            let once = c.correct(name);
            assert_eq!(c.correct(&once), once, "not idempotent for {name}");
        }
    }

    #[test]
    fn later_alias_wins_on_shared_suffix() {
        let table = TagTable::from_entries(vec![("calc", vec!["01-uni", "09-uni"])]).unwrap();
        let c = Corrector::new(table);
        assert_eq!(c.correct("01-uni.csv"), "09-uni.csv");
        assert_eq!(c.corrections().for_tag("calc").map(SuffixMap::len), Some(1));
    }

    #[test]
    fn correction_map_serializes_in_table_order() {
        let c = corrector();
        let json = serde_json::to_value(c.corrections()).unwrap();
        assert_eq!(json["route"]["006"], "06-frt-1006");
        let text = serde_json::to_string(c.corrections()).unwrap();
        assert!(text.starts_with(r#"{"mode":{"car":"01-car""#));
    }
}
