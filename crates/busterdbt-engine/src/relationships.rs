//! Relationship extraction from column tests, and multi-source merging

use busterdbt_core::{FieldPath, Issue, IssueCode, Relationship};
use busterdbt_dbt::{extract_model_name_from_ref, ColumnTest, RawModel};
use std::collections::HashSet;

/// Relationships found in a model's column tests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedRelationships {
    pub relationships: Vec<Relationship>,

    /// Incomplete `relationships` tests that were skipped
    pub issues: Vec<Issue>,
}

/// Collect `relationships: {to, field}` tests as many-to-one relationships
///
/// Plain string tests are ignored. A relationships test missing `to` or
/// `field` is skipped with a warning. Issue paths are relative to the model.
pub fn extract_relationships_from_model(model: &RawModel) -> ExtractedRelationships {
    let mut extracted = ExtractedRelationships::default();

    for (col_idx, column) in model.columns.iter().enumerate() {
        let column_path = FieldPath::root().key("columns").index(col_idx);
        let lists = [("tests", &column.tests), ("data_tests", &column.data_tests)];

        for (key, tests) in lists {
            for (test_idx, test) in tests.iter().enumerate() {
                let ColumnTest::Relationships { relationships } = test else {
                    continue;
                };

                match (relationships.target(), relationships.target_field()) {
                    (Some(to), Some(field)) => {
                        let target = extract_model_name_from_ref(to);
                        extracted.relationships.push(
                            Relationship::new(
                                format!("{}_rel", target),
                                column.name.clone(),
                                format!("{}.{}", target, field),
                            )
                            .with_description(format!(
                                "{} references {}.{}",
                                column.name, target, field
                            )),
                        );
                    }
                    _ => {
                        tracing::warn!(
                            model = %model.name,
                            column = %column.name,
                            "Skipping relationships test without both 'to' and 'field'"
                        );
                        extracted.issues.push(
                            Issue::warning(
                                IssueCode::IncompleteRelationshipTest,
                                format!(
                                    "relationships test on '{}.{}' needs both 'to' and 'field'",
                                    model.name, column.name
                                ),
                            )
                            .at(column_path.key(key).index(test_idx)),
                        );
                    }
                }
            }
        }
    }

    extracted
}

/// Concatenate relationship lists, dropping later duplicates of `source_col→ref_col`
///
/// Argument order is precedence: the first list wins.
pub fn merge_relationships(lists: &[&[Relationship]]) -> Vec<Relationship> {
    let mut seen = HashSet::new();

    lists
        .iter()
        .flat_map(|list| list.iter())
        .filter(|rel| seen.insert(rel.key()))
        .cloned()
        .collect()
}
