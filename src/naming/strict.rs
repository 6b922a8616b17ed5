use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::data::encoding::{read_text, TextEncoding};
use crate::error::{CurateError, Result};
use crate::naming::batch::scan;
use crate::naming::filename::stem_fragments;

/// Accepted files are copied flat, so only the top level of the source is checked by default.
pub const DEFAULT_CHECK_PATTERN: &str = "*.csv";

/// Alias set per position, from a header file whose rows are `<n> <key> <alias>...`.
#[derive(Debug, Clone, Default)]
pub struct HeaderSets {
    sets: Vec<HashSet<String>>,
}

impl HeaderSets {
    /// Every line is a position; short lines give an empty set that matches nothing.
    pub fn parse(text: &str) -> Self {
        let sets: Vec<HashSet<String>> = text
            .lines()
            .map(|line| line.split_whitespace().skip(2).map(str::to_string).collect())
            .collect();
        HeaderSets { sets }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::parse(&read_text(path, TextEncoding::Utf8)?))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Membership of each fragment that has a corresponding position.
    pub fn matches(&self, filename: &str) -> Vec<bool> {
        stem_fragments(filename)
            .iter()
            .zip(&self.sets)
            .map(|(fragment, set)| set.contains(*fragment))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub path: PathBuf,
    pub fragments: Vec<String>,
    pub matches: Vec<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub checked: usize,
    /// Files with every position matching; copied when a destination was given.
    pub accepted: Vec<PathBuf>,
    pub rejected: Vec<Rejected>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

pub fn check(
    header: &HeaderSets,
    source: &Path,
    pattern: &str,
    destination: Option<&Path>,
) -> Result<CheckReport> {
    let mut report = CheckReport::default();
    let mut copied: HashMap<PathBuf, PathBuf> = HashMap::new();
    if let Some(dst) = destination {
        fs::create_dir_all(dst).map_err(|err| CurateError::io(dst, err))?;
    }

    for path in scan(source, pattern)? {
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        report.checked += 1;

        let matches = header.matches(&filename);
        if matches.iter().all(|m| *m) {
            if let Some(dst) = destination {
                let target = dst.join(&filename);
                if let Some(first) = copied.get(&target) {
                    return Err(CurateError::TargetCollision {
                        first: first.clone(),
                        second: path,
                        target,
                    });
                }
                fs::metadata(&path).map_err(|err| CurateError::io(&path, err))?;
                fs::copy(&path, &target).map_err(|err| CurateError::io(&target, err))?;
                copied.insert(target.clone(), path.clone());
                debug!(file = %filename, target = %target.display(), "copied");
            }
            report.accepted.push(path);
        } else {
            info!(file = %filename, ?matches, "rejected");
            report.rejected.push(Rejected {
                fragments: stem_fragments(&filename).iter().map(|s| s.to_string()).collect(),
                path,
                matches,
            });
        }
    }
    Ok(report)
}
