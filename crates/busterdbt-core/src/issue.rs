//! Issue codes and structured error reporting
//!
//! IMPORTANT: Issue codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Issue code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // Loading
    /// Raw file text still contains `{{TODO}}` template markers
    FileContainsTodo,

    /// File text is not valid YAML
    YamlParseError,

    /// File is neither a dbt nor a Buster model file
    UnknownFileType,

    // Schema validation
    /// A required field is absent
    MissingField,

    /// A field has the wrong shape (e.g. string where a list is expected)
    InvalidType,

    /// A field has the right shape but an unsupported value
    InvalidValue,

    // File-level validation
    /// Neither `models` nor `semantic_models` declares anything
    NoModels,

    /// A semantic model refers to a model that is not declared in the file
    MissingBaseModel,

    /// A semantic model declares measures without `defaults.agg_time_dimension`
    MissingAggTimeDimension,

    // Transformation
    /// A model failed to transform and was omitted from the output
    ModelTransformFailed,

    /// An entity could not be mapped to a target model
    EntityUnresolved,

    /// A `relationships` column test lacks `to` or `field`
    IncompleteRelationshipTest,

    /// No primary key could be resolved; the configured fallback was used
    PrimaryKeyFallback,

    /// A model matched the skip allowlist
    ModelSkipped,
}

impl IssueCode {
    /// Get the issue code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileContainsTodo => "FILE_CONTAINS_TODO",
            Self::YamlParseError => "YAML_PARSE_ERROR",
            Self::UnknownFileType => "UNKNOWN_FILE_TYPE",
            Self::MissingField => "MISSING_FIELD",
            Self::InvalidType => "INVALID_TYPE",
            Self::InvalidValue => "INVALID_VALUE",
            Self::NoModels => "NO_MODELS",
            Self::MissingBaseModel => "MISSING_BASE_MODEL",
            Self::MissingAggTimeDimension => "MISSING_AGG_TIME_DIMENSION",
            Self::ModelTransformFailed => "MODEL_TRANSFORM_FAILED",
            Self::EntityUnresolved => "ENTITY_UNRESOLVED",
            Self::IncompleteRelationshipTest => "INCOMPLETE_RELATIONSHIP_TEST",
            Self::PrimaryKeyFallback => "PRIMARY_KEY_FALLBACK",
            Self::ModelSkipped => "MODEL_SKIPPED",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - surfaced but does not block output
    Warn,

    /// Error - the affected file or model produced no output
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single structured problem found while loading or transforming a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Stable issue code
    pub code: IssueCode,

    /// Severity level
    pub severity: Severity,

    /// Field path inside the input document (e.g. `models[0].columns[2].name`).
    /// Empty when the issue concerns the whole file.
    pub path: String,

    /// Human-readable message
    pub message: String,
}

impl Issue {
    /// Create a new issue without a field path
    pub fn new(code: IssueCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            path: String::new(),
            message: message.into(),
        }
    }

    /// Shorthand for an error-level issue
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Shorthand for a warning-level issue
    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, message)
    }

    /// Set the field path
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.code, self.path, self.message)
        }
    }
}

/// Issues grouped by the model they concern (`None` for file-level issues)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIssues {
    /// Model name, when the issues belong to one model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// The issues themselves
    pub issues: Vec<Issue>,
}

impl ModelIssues {
    /// File-level issue group
    pub fn file(issues: Vec<Issue>) -> Self {
        Self { model: None, issues }
    }

    /// Issue group for a single model
    pub fn for_model(model: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            model: Some(model.into()),
            issues,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(Issue::is_error)
    }
}

/// Build a dotted/indexed field path segment by segment
///
/// ```
/// use busterdbt_core::issue::FieldPath;
/// let path = FieldPath::root().key("models").index(0).key("name");
/// assert_eq!(path.to_string(), "models[0].name");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Append a mapping key
    pub fn key(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}.{}", self.0, key))
        }
    }

    /// Append a sequence index
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}
