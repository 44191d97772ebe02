//! File loading: TODO check, YAML parse, shape detection, schema validation
//!
//! The loader turns raw text into one of the two typed shapes or a
//! [`LoadError`] that carries structured issues for the caller to render.

use busterdbt_core::{Issue, IssueCode, OutputModel};
use serde_yaml::Value;
use std::path::Path;

use crate::detect::{contains_todo_markers, detect_file_type, FileType};
use crate::schema::DbtFile;
use crate::validate::{validate_buster_structure, validate_dbt_structure};

/// A successfully loaded and schema-validated file
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedFile {
    /// dbt schema file (models and/or semantic models)
    Dbt(DbtFile),

    /// Already a Buster model
    Buster(OutputModel),
}

impl LoadedFile {
    pub fn file_type(&self) -> FileType {
        match self {
            Self::Dbt(_) => FileType::Dbt,
            Self::Buster(_) => FileType::Buster,
        }
    }
}

/// File loading errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("File contains {{{{TODO}}}} markers; finish the template before loading it")]
    ContainsTodo,

    #[error("Failed to read {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse YAML: {0}")]
    ParseError(String),

    #[error("Unrecognized file type: expected a dbt schema (models/semantic_models) or a Buster model (name plus dimensions/measures)")]
    UnknownFileType,

    #[error("{file_type} file failed schema validation with {} issue(s)", issues.len())]
    SchemaError {
        file_type: FileType,
        issues: Vec<Issue>,
    },
}

impl LoadError {
    /// Convert to structured issues
    pub fn to_issues(&self) -> Vec<Issue> {
        match self {
            Self::ContainsTodo => vec![Issue::error(IssueCode::FileContainsTodo, self.to_string())],
            Self::IoError(..) | Self::ParseError(_) => {
                vec![Issue::error(IssueCode::YamlParseError, self.to_string())]
            }
            Self::UnknownFileType => vec![Issue::error(IssueCode::UnknownFileType, self.to_string())],
            Self::SchemaError { issues, .. } => issues.clone(),
        }
    }
}

/// Load a file from disk
pub fn load_file(path: &Path) -> Result<LoadedFile, LoadError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| LoadError::IoError(path.display().to_string(), e.to_string()))?;

    load_str(&contents)
}

/// Load a file from its raw text
pub fn load_str(text: &str) -> Result<LoadedFile, LoadError> {
    if contains_todo_markers(text) {
        return Err(LoadError::ContainsTodo);
    }

    let document: Value = serde_yaml::from_str(text)
        .map_err(|e| LoadError::ParseError(e.to_string()))?;

    load_value(document)
}

/// Load an already-parsed document
pub fn load_value(document: Value) -> Result<LoadedFile, LoadError> {
    let file_type = detect_file_type(&document);
    tracing::debug!(%file_type, "Detected file type");

    match file_type {
        FileType::Dbt => {
            check_structure(FileType::Dbt, validate_dbt_structure(&document))?;
            let file = serde_yaml::from_value(document)
                .map_err(|e| typed_error(FileType::Dbt, e))?;
            Ok(LoadedFile::Dbt(file))
        }
        FileType::Buster => {
            check_structure(FileType::Buster, validate_buster_structure(&document))?;
            let model = serde_yaml::from_value(document)
                .map_err(|e| typed_error(FileType::Buster, e))?;
            Ok(LoadedFile::Buster(model))
        }
        FileType::Unknown => Err(LoadError::UnknownFileType),
    }
}

fn check_structure(file_type: FileType, issues: Vec<Issue>) -> Result<(), LoadError> {
    if issues.iter().any(Issue::is_error) {
        tracing::debug!(%file_type, issues = issues.len(), "Schema validation failed");
        Err(LoadError::SchemaError { file_type, issues })
    } else {
        Ok(())
    }
}

/// Anything the structural pass let through but serde still rejects
fn typed_error(file_type: FileType, error: serde_yaml::Error) -> LoadError {
    LoadError::SchemaError {
        file_type,
        issues: vec![Issue::error(IssueCode::InvalidValue, error.to_string())],
    }
}
