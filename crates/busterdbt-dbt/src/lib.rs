//! dbt schema file loading and validation
//!
//! This crate handles:
//! - Typed dbt model and MetricFlow semantic model YAML structures
//! - File shape detection (dbt vs Buster) and TODO marker rejection
//! - Structural schema validation with field-path issues
//! - File-level validation before transformation
//! - `ref('model')` extraction

pub mod schema;
pub mod refs;
pub mod detect;
pub mod validate;
pub mod loader;

pub use schema::{
    DbtFile, RawModel, RawColumn, ColumnMeta, ColumnConfig, ColumnTest, RelationshipTest,
    ColumnConstraint, RawRelationship, RawSemanticModel, Entity, EntityType, SemanticDimension,
    DimensionTypeParams, SemanticMeasure, AggregationType, AggregationParams, SemanticDefaults,
};
pub use refs::extract_model_name_from_ref;
pub use detect::{detect_file_type, contains_todo_markers, FileType};
pub use validate::{validate_dbt_file_for_transformation, validate_dbt_structure, validate_buster_structure, ValidationResult};
pub use loader::{load_file, load_str, load_value, LoadedFile, LoadError};
