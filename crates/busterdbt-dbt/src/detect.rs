//! File shape detection
//!
//! Sniffs a parsed YAML document to decide whether it is a Buster model
//! file or a dbt schema file. Detection is deliberately lenient: it only
//! looks at which top-level keys exist so that schema validation can report
//! detailed field-level errors afterwards.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Literal marker left in unfinished template files
pub const TODO_MARKER: &str = "{{TODO}}";

/// Detected file shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Top-level `name` plus `dimensions` or `measures`
    Buster,

    /// Top-level `models` or `semantic_models`
    Dbt,

    /// Neither shape
    Unknown,
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buster => write!(f, "buster"),
            Self::Dbt => write!(f, "dbt"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Detect the shape of a parsed document
pub fn detect_file_type(document: &Value) -> FileType {
    let Some(mapping) = document.as_mapping() else {
        return FileType::Unknown;
    };

    let has = |key: &str| mapping.contains_key(key);

    if has("name") && (has("dimensions") || has("measures")) {
        FileType::Buster
    } else if has("models") || has("semantic_models") {
        FileType::Dbt
    } else {
        FileType::Unknown
    }
}

/// Check raw file text for unfinished `{{TODO}}` markers
pub fn contains_todo_markers(text: &str) -> bool {
    text.contains(TODO_MARKER)
}
