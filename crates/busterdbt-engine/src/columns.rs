//! Column transformer: raw columns into dimensions and measures

use busterdbt_core::{Dimension, Measure, OptionValue, PrimitiveValue};
use busterdbt_dbt::{schema::scalar_to_string, RawColumn};
use serde_yaml::Value;

use crate::classifier::{infer_dimension_type, infer_numeric_type, is_numeric_column};

/// Result of splitting a column list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTransform {
    pub dimensions: Vec<Dimension>,
    pub measures: Vec<Measure>,
}

/// Classify every column and build the matching output record, in input order
pub fn transform_columns(columns: &[RawColumn]) -> ColumnTransform {
    let mut result = ColumnTransform::default();

    for column in columns {
        if is_numeric_column(column) {
            result.measures.push(column_to_measure(column));
        } else {
            result.dimensions.push(column_to_dimension(column));
        }
    }

    result
}

/// Build a measure, annotating the description with the unit when it is not already mentioned
pub fn column_to_measure(column: &RawColumn) -> Measure {
    let description = column.description_or_empty().to_string();
    let unit = column.meta().and_then(|m| m.unit());

    let description = match unit {
        Some(unit) if description.is_empty() => format!("Measured in {}", unit),
        Some(unit) if !description.to_lowercase().contains(&unit.to_lowercase()) => {
            format!("{} ({})", description, unit)
        }
        _ => description,
    };

    Measure {
        name: column.name.clone(),
        description,
        measure_type: infer_numeric_type(column),
    }
}

/// Build a dimension
///
/// Top-level `searchable`/`options` win over the metadata bag; only a
/// boolean `searchable` and a list-valued `options` count.
pub fn column_to_dimension(column: &RawColumn) -> Dimension {
    let meta = column.meta();

    let searchable = column
        .searchable
        .as_ref()
        .and_then(Value::as_bool)
        .or_else(|| meta.and_then(|m| m.searchable()))
        .unwrap_or(false);

    let options = column
        .options
        .as_ref()
        .and_then(Value::as_sequence)
        .or_else(|| meta.and_then(|m| m.options()))
        .map(|entries| entries.iter().map(normalize_option).collect())
        .unwrap_or_default();

    Dimension {
        name: column.name.clone(),
        description: Some(column.description_or_empty().to_string()),
        dimension_type: infer_dimension_type(column),
        searchable,
        options: None,
        time_granularity: None,
    }
    .with_options(options)
}

/// Normalize one option entry
///
/// `{value, description?}` objects and scalars pass through; anything else
/// is rendered as its string form.
pub fn normalize_option(entry: &Value) -> OptionValue {
    if let Value::Mapping(mapping) = entry {
        if let Some(value) = mapping.get("value") {
            return OptionValue::Valued {
                value: to_primitive(value),
                description: mapping.get("description").and_then(scalar_to_string),
            };
        }
    }

    OptionValue::Primitive(to_primitive(entry))
}

fn to_primitive(value: &Value) -> PrimitiveValue {
    match value {
        Value::Bool(b) => PrimitiveValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => PrimitiveValue::Integer(i),
            None => PrimitiveValue::Float(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => PrimitiveValue::String(s.clone()),
        other => PrimitiveValue::String(serde_json::to_string(other).unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use busterdbt_core::{DimensionType, MeasureType};
    use pretty_assertions::assert_eq;

    fn column(yaml: &str) -> RawColumn {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn splits_measures_and_dimensions_in_order() {
        let columns = vec![
            column("name: order_id"),
            column("name: amount\ndata_type: numeric(10,2)"),
            column("name: status"),
            column("name: item_count"),
        ];

        let result = transform_columns(&columns);
        let dims: Vec<_> = result.dimensions.iter().map(|d| d.name.as_str()).collect();
        let measures: Vec<_> = result.measures.iter().map(|m| m.name.as_str()).collect();

        assert_eq!(dims, vec!["order_id", "status"]);
        assert_eq!(measures, vec!["amount", "item_count"]);
        assert_eq!(result.measures[0].measure_type, MeasureType::Decimal);
        assert_eq!(result.measures[1].measure_type, MeasureType::Integer);
    }

    #[test]
    fn top_level_fields_win_over_meta() {
        let col = column(
            r#"
name: color
searchable: true
options: [Black, Silver]
config:
  meta:
    searchable: false
    options: [Red]
"#,
        );

        let dim = column_to_dimension(&col);
        assert!(dim.searchable);
        assert_eq!(dim.options, Some(vec!["Black".into(), "Silver".into()]));
    }

    #[test]
    fn meta_used_when_top_level_absent_or_wrong_type() {
        let col = column(
            r#"
name: color
searchable: "yes"
options: not-a-list
config:
  meta:
    searchable: true
    options: [Red]
"#,
        );

        let dim = column_to_dimension(&col);
        assert!(dim.searchable);
        assert_eq!(dim.options, Some(vec!["Red".into()]));
    }

    #[test]
    fn defaults_without_hints() {
        let dim = column_to_dimension(&column("name: region"));
        assert!(!dim.searchable);
        assert_eq!(dim.options, None);
        assert_eq!(dim.description.as_deref(), Some(""));
        assert_eq!(dim.dimension_type, DimensionType::String);
    }

    #[test]
    fn empty_options_are_omitted() {
        let dim = column_to_dimension(&column("name: region\noptions: []"));
        assert_eq!(dim.options, None);
    }

    #[test]
    fn mixed_options_keep_order() {
        let col = column(
            r#"
name: size
options:
  - small
  - 2
  - true
  - 1.5
  - value: xl
    description: Extra large
  - [nested]
"#,
        );

        let dim = column_to_dimension(&col);
        assert_eq!(
            dim.options,
            Some(vec![
                OptionValue::Primitive(PrimitiveValue::String("small".to_string())),
                OptionValue::Primitive(PrimitiveValue::Integer(2)),
                OptionValue::Primitive(PrimitiveValue::Bool(true)),
                OptionValue::Primitive(PrimitiveValue::Float(1.5)),
                OptionValue::Valued {
                    value: PrimitiveValue::String("xl".to_string()),
                    description: Some("Extra large".to_string()),
                },
                OptionValue::Primitive(PrimitiveValue::String("[\"nested\"]".to_string())),
            ])
        );
    }

    #[test]
    fn unit_annotation() {
        let col = column("name: amount\ndescription: Order total\nconfig:\n  meta:\n    unit: USD");
        assert_eq!(column_to_measure(&col).description, "Order total (USD)");

        let col = column("name: amount\ndescription: Order total in usd\nconfig:\n  meta:\n    unit: USD");
        assert_eq!(column_to_measure(&col).description, "Order total in usd");

        let col = column("name: weight\nmeta:\n  unit: kg");
        assert_eq!(column_to_measure(&col).description, "Measured in kg");
    }
}
