//! Transform report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::issue::{ModelIssues, Severity};
use crate::model::OutputModel;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Counts over the produced models and the collected issues
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    pub models: usize,
    pub dimensions: usize,
    pub measures: usize,
    pub metrics: usize,
    pub filters: usize,
    pub relationships: usize,

    /// Number of error-level issues
    pub errors: usize,

    /// Number of warning-level issues
    pub warnings: usize,
}

impl TransformStats {
    /// Compute statistics for a set of models and issues
    pub fn collect(models: &[OutputModel], issues: &[ModelIssues]) -> Self {
        let mut stats = Self {
            models: models.len(),
            ..Self::default()
        };

        for model in models {
            stats.dimensions += model.dimensions.len();
            stats.measures += model.measures.len();
            stats.metrics += model.metrics.len();
            stats.filters += model.filters.len();
            stats.relationships += model.relationships.len();
        }

        for issue in issues.iter().flat_map(|group| &group.issues) {
            match issue.severity {
                Severity::Error => stats.errors += 1,
                Severity::Warn => stats.warnings += 1,
                Severity::Info => {}
            }
        }

        stats
    }
}

/// Transform report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub stats: TransformStats,

    /// All issues, grouped by model
    pub issues: Vec<ModelIssues>,
}

impl TransformReport {
    /// Create a report for one transformation run
    pub fn new(models: &[OutputModel], issues: Vec<ModelIssues>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            stats: TransformStats::collect(models, &issues),
            issues,
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.stats.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{Issue, IssueCode};
    use crate::model::{Dimension, DimensionType, Metric};

    fn sample_model() -> OutputModel {
        let mut model = OutputModel::new("orders");
        model.dimensions.push(Dimension::new("status", DimensionType::String));
        model.dimensions.push(Dimension::new("ordered_at", DimensionType::Time));
        model.metrics.push(Metric {
            name: "order_count".to_string(),
            expr: "count(*)".to_string(),
            description: String::new(),
            args: Vec::new(),
        });
        model
    }

    #[test]
    fn stats_count_models_and_issues() {
        let issues = vec![
            ModelIssues::file(vec![Issue::warning(IssueCode::MissingBaseModel, "missing")]),
            ModelIssues::for_model(
                "payments",
                vec![Issue::error(IssueCode::ModelTransformFailed, "boom")],
            ),
        ];

        let stats = TransformStats::collect(&[sample_model()], &issues);
        assert_eq!(stats.models, 1);
        assert_eq!(stats.dimensions, 2);
        assert_eq!(stats.metrics, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.warnings, 1);
    }

    #[test]
    fn report_serialization() {
        let report = TransformReport::new(&[sample_model()], Vec::new());
        assert!(!report.has_errors());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"stats\""));
    }
}
