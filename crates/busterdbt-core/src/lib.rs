//! busterdbt core
//!
//! Core domain model with stable, versioned types.
//! Never rename issue codes - they are part of the public API.

pub mod issue;
pub mod model;
pub mod report;
pub mod config;

pub use issue::{Issue, IssueCode, Severity, ModelIssues, FieldPath};
pub use model::{
    OutputModel, Dimension, DimensionType, Measure, MeasureType, Metric, Filter, Argument,
    Relationship, RelationshipType, Cardinality, OptionValue, PrimitiveValue,
};
pub use report::{TransformReport, TransformStats, ReportVersion};
pub use config::{Config, ConfigError, SeverityThreshold, AllowlistRules};
