use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurateError>;

#[derive(Debug, Error)]
pub enum CurateError {
    #[error("malformed row {line}: expected at least 3 fields, found {found}")]
    MalformedRow { line: usize, found: usize },

    #[error("duplicate tag '{tag}' on row {line}")]
    DuplicateTag { tag: String, line: usize },

    #[error("row range [{first}, {last}) selects no rows")]
    EmptyTagTable { first: usize, last: usize },

    #[error("pivot column '{pivot}' is not one of the named columns [{}]", .columns.join(", "))]
    MissingColumn { pivot: String, columns: Vec<String> },

    #[error("unable to decode '{}' as {encoding}", .path.display())]
    Decode { path: PathBuf, encoding: String },

    #[error("tag '{tag}' has no aliases")]
    EmptyAliases { tag: String },

    #[error("'{}' and '{}' would both be copied to '{}'", .first.display(), .second.display(), .target.display())]
    TargetCollision {
        first: PathBuf,
        second: PathBuf,
        target: PathBuf,
    },

    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),

    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl CurateError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
