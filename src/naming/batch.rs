use std::fs;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use tracing::{debug, info};

use crate::data::taxonomy::{Taxonomy, NOT_FOUND_TEXT, TX_ID_FIELD};
use crate::error::{CurateError, Result};
use crate::naming::audit::{AuditLog, CorrectionRecord, DEFAULT_AUDIT_FILE};
use crate::naming::corrector::{Corrector, ValidationOutcome};

pub const DEFAULT_PATTERN: &str = "**/*.csv";

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Glob relative to `source`.
    pub pattern: String,
    /// Audit file name inside `destination`.
    pub audit_file: String,
}

impl BatchOptions {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        BatchOptions {
            source: source.into(),
            destination: destination.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            audit_file: DEFAULT_AUDIT_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub unchanged: usize,
    pub corrected: usize,
    /// Sentinel substitutions across all files.
    pub unresolved_tags: usize,
    pub audit_path: PathBuf,
}

/// Files under `source` matching `pattern`, in glob (alphabetical) order. Hidden files
/// and directories are skipped unless the pattern names the leading dot.
pub fn scan(source: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let root = glob::Pattern::escape(&source.to_string_lossy());
    let full = format!("{}/{}", root.trim_end_matches('/'), pattern);
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let mut paths = Vec::new();
    for entry in glob::glob_with(&full, options)? {
        let path = entry.map_err(|err| {
            let path = err.path().to_path_buf();
            CurateError::io(path, err.into_error())
        })?;
        paths.push(path);
    }
    Ok(paths)
}

/// Destination for a source file: one level of the source's parent directory name is kept.
pub fn destination_for(destination: &Path, source_file: &Path, corrected: &str) -> PathBuf {
    let subdir = source_file.parent().and_then(Path::file_name);
    match subdir {
        Some(name) => destination.join(name).join(corrected),
        None => destination.join(corrected),
    }
}

/// Per file: read the source, validate, append the audit row, then write the copy.
/// The first I/O error aborts the batch.
pub fn run_batch(
    corrector: &Corrector,
    options: &BatchOptions,
    taxonomy: Option<&Taxonomy>,
) -> Result<BatchSummary> {
    let paths = scan(&options.source, &options.pattern)?;
    fs::create_dir_all(&options.destination)
        .map_err(|err| CurateError::io(&options.destination, err))?;

    let audit = AuditLog::new(options.destination.join(&options.audit_file));
    let mut summary = BatchSummary {
        audit_path: audit.path().to_path_buf(),
        ..BatchSummary::default()
    };
    info!(files = paths.len(), source = %options.source.display(), "starting batch");

    for path in paths {
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let bytes = fs::read(&path).map_err(|err| CurateError::io(&path, err))?;
        let permissions = fs::metadata(&path)
            .map_err(|err| CurateError::io(&path, err))?
            .permissions();

        let outcome = corrector.validate(&filename);
        if let Some(taxonomy) = taxonomy {
            describe_tags(taxonomy, &outcome);
        }
        audit.append(&CorrectionRecord::from(&outcome))?;

        let target = destination_for(&options.destination, &path, &outcome.corrected);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| CurateError::io(parent, err))?;
        }
        fs::write(&target, &bytes).map_err(|err| CurateError::io(&target, err))?;
        fs::set_permissions(&target, permissions).map_err(|err| CurateError::io(&target, err))?;

        summary.processed += 1;
        summary.unresolved_tags += outcome.unresolved_count();
        if outcome.unchanged {
            summary.unchanged += 1;
            debug!(file = %filename, "name already canonical");
        } else {
            summary.corrected += 1;
            info!(from = %filename, to = %outcome.corrected, "corrected file name");
        }
    }

    info!(
        processed = summary.processed,
        unchanged = summary.unchanged,
        corrected = summary.corrected,
        unresolved_tags = summary.unresolved_tags,
        "batch complete"
    );
    Ok(summary)
}

fn describe_tags(taxonomy: &Taxonomy, outcome: &ValidationOutcome) {
    for tag in &outcome.tags {
        let key = format!("{}-{}", tag.position + 1, tag.value);
        let text = taxonomy
            .text_for(&key, TX_ID_FIELD)
            .unwrap_or_else(|| NOT_FOUND_TEXT.to_string());
        debug!(file = %outcome.original, key = %key, text = %text, "tag description");
    }
}
