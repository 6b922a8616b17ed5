use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CurateError, Result};
use crate::naming::corrector::ValidationOutcome;

pub const DEFAULT_AUDIT_FILE: &str = "corrections.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub original_filename: String,
    pub corrected_filename: String,
    pub unchanged: bool,
}

impl From<&ValidationOutcome> for CorrectionRecord {
    fn from(outcome: &ValidationOutcome) -> Self {
        CorrectionRecord {
            original_filename: outcome.original.clone(),
            corrected_filename: outcome.corrected.clone(),
            unchanged: outcome.unchanged,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AuditLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row. The file is opened and closed per record.
    pub fn append(&self, record: &CorrectionRecord) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| CurateError::io(&self.path, err))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush().map_err(|err| CurateError::io(&self.path, err))
    }

    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<CorrectionRecord>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| CurateError::io(path, err))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(file);
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(original: &str, corrected: &str) -> CorrectionRecord {
        CorrectionRecord {
            original_filename: original.to_string(),
            corrected_filename: corrected.to_string(),
            unchanged: original == corrected,
        }
    }

    #[test]
    fn append_accumulates_rows_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join(DEFAULT_AUDIT_FILE));

        log.append(&record("a.csv", "a.csv")).unwrap();
        log.append(&record("b,c.csv", "00-n.csv")).unwrap();

        let rows = AuditLog::read_all(log.path()).unwrap();
        assert_eq!(rows, vec![record("a.csv", "a.csv"), record("b,c.csv", "00-n.csv")]);

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw, "a.csv,a.csv,true\n\"b,c.csv\",00-n.csv,false\n");
    }

    #[test]
    fn append_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("missing").join(DEFAULT_AUDIT_FILE));
        assert!(matches!(
            log.append(&record("a.csv", "a.csv")),
            Err(CurateError::Io { .. })
        ));
    }
}
