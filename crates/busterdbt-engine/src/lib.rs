//! busterdbt engine - dbt to Buster model transformation
//!
//! This crate implements the transformation pipeline:
//! - Column type classification
//! - Column to dimension/measure conversion
//! - Dimension merging with semantic dimensions
//! - Metric and filter synthesis
//! - Entity and relationship-test resolution
//! - Per-file orchestration with per-model error isolation

pub mod error;
pub mod classifier;
pub mod columns;
pub mod dimensions;
pub mod metrics;
pub mod filters;
pub mod entities;
pub mod relationships;
pub mod transformer;

pub use error::{ResolveError, TransformError};
pub use classifier::{infer_dimension_type, infer_numeric_type, is_numeric_column};
pub use columns::{transform_columns, ColumnTransform};
pub use dimensions::{dimensions_match, is_complex_expression, merge_dimensions};
pub use metrics::measure_to_metric;
pub use filters::{create_custom_filter, dimension_to_filters};
pub use entities::{EntityResolution, EntityResolver};
pub use relationships::{extract_relationships_from_model, merge_relationships, ExtractedRelationships};
pub use transformer::{transform_dbt_file, transform_source, TransformOutcome};
