use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::data::encoding::TextEncoding;
use crate::data::tags::{DEFAULT_FIRST_ROW, DEFAULT_LAST_ROW, DEFAULT_TAGS_FILE};
use crate::data::taxonomy::DEFAULT_PIVOT;
use crate::error::{CurateError, Result};
use crate::naming::audit::DEFAULT_AUDIT_FILE;
use crate::naming::batch::DEFAULT_PATTERN;

pub const DEFAULT_CONFIG_FILE: &str = "curator.yaml";
pub const CONFIG_ENV: &str = "CURATOR_CONFIG";
pub const TAGS_PATH_ENV: &str = "CURATOR_TAGS_PATH";
pub const PATTERN_ENV: &str = "CURATOR_PATTERN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `tags.json` used by `validate` and `corrections`.
    pub tags_path: PathBuf,
    pub audit_file: String,
    pub pattern: String,
    pub tag_encoding: TextEncoding,
    pub table_encoding: TextEncoding,
    pub first_row: usize,
    pub last_row: usize,
    pub pivot: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tags_path: PathBuf::from(DEFAULT_TAGS_FILE),
            audit_file: DEFAULT_AUDIT_FILE.to_string(),
            pattern: DEFAULT_PATTERN.to_string(),
            tag_encoding: TextEncoding::Utf16,
            table_encoding: TextEncoding::Utf8,
            first_row: DEFAULT_FIRST_ROW,
            last_row: DEFAULT_LAST_ROW,
            pivot: DEFAULT_PIVOT.to_string(),
        }
    }
}

impl Settings {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Resolve the config file, parse it and apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Some(path),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };

        let settings = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                let text = fs::read_to_string(&path).map_err(|err| CurateError::io(&path, err))?;
                Self::from_yaml(&text)?
            }
            None => Settings::default(),
        };
        Ok(settings.with_overrides(|key| env::var(key).ok()))
    }

    /// Apply `CURATOR_TAGS_PATH` / `CURATOR_PATTERN` style overrides from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(TAGS_PATH_ENV).filter(|v| !v.is_empty()) {
            self.tags_path = PathBuf::from(path);
        }
        if let Some(pattern) = lookup(PATTERN_ENV).filter(|v| !v.is_empty()) {
            self.pattern = pattern;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        assert_eq!(Settings::from_yaml("").unwrap(), Settings::default());
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        let settings = Settings::from_yaml(
            "tags_path: conf/tags.json\ntag_encoding: utf-16le\nfirst_row: 2\n",
        )
        .unwrap();
        assert_eq!(settings.tags_path, PathBuf::from("conf/tags.json"));
        assert_eq!(settings.tag_encoding, TextEncoding::Utf16Le);
        assert_eq!(settings.first_row, 2);
        assert_eq!(settings.last_row, DEFAULT_LAST_ROW);
    }

    #[test]
    fn unknown_keys_and_encodings_are_rejected() {
        assert!(Settings::from_yaml("tag_path: x\n").is_err());
        assert!(Settings::from_yaml("tag_encoding: ebcdic\n").is_err());
    }

    #[test]
    fn overrides_apply_non_empty_values() {
        let settings = Settings::default().with_overrides(|key| match key {
            TAGS_PATH_ENV => Some("/srv/tags.json".to_string()),
            PATTERN_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(settings.tags_path, PathBuf::from("/srv/tags.json"));
        assert_eq!(settings.pattern, DEFAULT_PATTERN);
    }
}
