//! Integration tests for loading and validating schema files

use busterdbt_core::IssueCode;
use busterdbt_dbt::{load_file, load_str, validate_dbt_file_for_transformation, FileType, LoadError, LoadedFile};
use std::io::Write;

const SEMANTIC_ONLY: &str = r#"
version: 2
semantic_models:
  - name: orders_sm
    model: "{{ ref('orders') }}"
    entities:
      - name: order
        type: primary
        expr: order_id
    measures:
      - name: order_total
        agg: sum
        expr: amount
"#;

fn load_dbt(yaml: &str) -> busterdbt_dbt::DbtFile {
    match load_str(yaml).unwrap() {
        LoadedFile::Dbt(file) => file,
        other => panic!("Expected dbt file, got {:?}", other),
    }
}

#[test]
fn test_semantic_only_file_warnings() {
    let file = load_dbt(SEMANTIC_ONLY);
    let result = validate_dbt_file_for_transformation(&file);

    assert!(result.valid);
    assert!(result.errors.is_empty());

    let codes: Vec<_> = result.warnings.iter().map(|w| w.code).collect();
    assert_eq!(codes, vec![IssueCode::MissingBaseModel, IssueCode::MissingAggTimeDimension]);
    assert!(result.warnings[1].message.contains("agg_time_dimension"));
    assert_eq!(result.warnings[1].path, "semantic_models[0].defaults.agg_time_dimension");
}

#[test]
fn test_empty_lists_fail_validation() {
    let file = load_dbt("models: []\nsemantic_models: ~\n");
    let result = validate_dbt_file_for_transformation(&file);

    assert!(!result.valid);
    assert_eq!(result.errors[0].code, IssueCode::NoModels);
    assert!(result.errors[0].message.contains("at least one model"));
}

#[test]
fn test_structural_errors_carry_paths() {
    let yaml = r#"
models:
  - name: orders
    columns:
      - description: missing name
semantic_models:
  - name: orders_sm
    model: ref('orders')
    entities:
      - name: order
        type: sideways
"#;

    match load_str(yaml).unwrap_err() {
        LoadError::SchemaError { file_type, issues } => {
            assert_eq!(file_type, FileType::Dbt);
            let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
            assert!(paths.contains(&"models[0].columns[0].name"));
            assert!(paths.contains(&"semantic_models[0].entities[0].type"));
        }
        other => panic!("Expected schema error, got {:?}", other),
    }
}

#[test]
fn test_capitalized_entity_type_reported_at_field() {
    let yaml = r#"
semantic_models:
  - name: orders_sm
    model: ref('orders')
    entities:
      - name: order
        type: Primary
"#;

    match load_str(yaml).unwrap_err() {
        LoadError::SchemaError { issues, .. } => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].code, IssueCode::InvalidValue);
            assert_eq!(issues[0].path, "semantic_models[0].entities[0].type");
        }
        other => panic!("Expected schema error, got {:?}", other),
    }
}

#[test]
fn test_load_from_disk() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(SEMANTIC_ONLY.as_bytes()).unwrap();

    let loaded = load_file(tmp.path()).unwrap();
    assert_eq!(loaded.file_type(), FileType::Dbt);

    let missing = load_file(&tmp.path().with_extension("missing"));
    assert!(matches!(missing, Err(LoadError::IoError(..))));
}
