//! Engine error types

use busterdbt_core::{Issue, IssueCode};
use busterdbt_dbt::LoadError;

/// Errors that abort a single model, or a whole file
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Measure '{measure}' with aggregation '{agg}' requires an expr")]
    MissingExpr { measure: String, agg: String },

    #[error("Measure '{measure}' with aggregation 'percentile' requires agg_params.percentile")]
    MissingPercentile { measure: String },

    #[error("Measure '{measure}' has percentile {value}; expected a value between 0 and 1")]
    PercentileOutOfRange { measure: String, value: f64 },

    #[error("Filter '{filter}' references {{{{{placeholder}}}}} but declares no argument named '{placeholder}'")]
    UnknownPlaceholder { filter: String, placeholder: String },

    #[error("File failed validation: {}", first_message(.0))]
    Validation(Vec<Issue>),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl TransformError {
    /// Convert to structured issues
    pub fn to_issues(&self) -> Vec<Issue> {
        match self {
            Self::Validation(issues) => issues.clone(),
            Self::Load(err) => err.to_issues(),
            _ => vec![Issue::error(IssueCode::ModelTransformFailed, self.to_string())],
        }
    }
}

fn first_message(issues: &[Issue]) -> String {
    issues
        .iter()
        .find(|i| i.is_error())
        .map(|i| i.message.clone())
        .unwrap_or_default()
}

/// Entity resolution failures; always caught per entity
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Could not resolve entity '{entity}' to a model (tried: {})", tried.join(", "))]
    ModelNotFound { entity: String, tried: Vec<String> },
}
