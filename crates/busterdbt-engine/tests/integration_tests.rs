//! End-to-end transformation of whole dbt schema files

use busterdbt_core::{Config, DimensionType, IssueCode, MeasureType, OptionValue, RelationshipType};
use busterdbt_dbt::DbtFile;
use busterdbt_engine::{transform_dbt_file, transform_source, TransformError};
use pretty_assertions::assert_eq;

const CATALOG_YAML: &str = r#"
version: 2
models:
  - name: products
    description: Product catalog
    columns:
      - name: product_id
        data_tests: [unique, not_null]
      - name: color
        searchable: true
        options: [Black, Silver, Red]
      - name: sellEndDate
        data_type: timestamp
      - name: list_price
        data_type: numeric(10,2)
        config:
          meta:
            unit: USD
      - name: category_id
        tests:
          - relationships:
              to: ref('categories')
              field: category_id
  - name: categories
    columns:
      - name: category_id
        constraints:
          - type: primary_key
      - name: category_name
  - name: orders
    columns:
      - name: order_id
      - name: product_id
semantic_models:
  - name: products_sm
    model: ref('products')
    description: Products semantic layer
    defaults:
      agg_time_dimension: sellEndDate
    entities:
      - name: product
        type: primary
        expr: product_id
      - name: category
        type: foreign
        expr: category_id
    dimensions:
      - name: color
        type: categorical
      - name: is_active
        type: categorical
        expr: CASE WHEN sellEndDate IS NULL THEN true ELSE false END
      - name: sellEndDate
        type: time
        type_params:
          time_granularity: day
    measures:
      - name: total_list_price
        agg: sum
        expr: list_price
      - name: product_count
        agg: count
  - name: orders_sm
    model: "{{ ref('orders') }}"
    entities:
      - name: order
        type: primary
        expr: order_id
    measures:
      - name: revenue
        agg: sum
"#;

fn transform(yaml: &str) -> busterdbt_engine::TransformOutcome {
    let file = DbtFile::from_yaml(yaml).unwrap();
    transform_dbt_file(&file, &Config::default()).unwrap()
}

#[test]
fn test_full_catalog_file() {
    let outcome = transform(CATALOG_YAML);

    let names: Vec<_> = outcome.models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["products", "categories"]);

    let products = &outcome.models[0];
    assert_eq!(products.description, "Products semantic layer");

    let dims: Vec<_> = products.dimensions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(dims, vec!["color", "is_active", "sellEndDate", "product_id", "category_id"]);

    let color = products.find_dimension("color").unwrap();
    assert_eq!(color.dimension_type, DimensionType::String);
    assert!(color.searchable);
    assert_eq!(
        color.options,
        Some(vec![OptionValue::from("Black"), OptionValue::from("Silver"), OptionValue::from("Red")])
    );

    let sell_end = products.find_dimension("sellEndDate").unwrap();
    assert_eq!(sell_end.dimension_type, DimensionType::Time);
    assert_eq!(sell_end.time_granularity.as_deref(), Some("day"));

    let list_price = products.find_measure("list_price").unwrap();
    assert_eq!(list_price.measure_type, MeasureType::Decimal);
    assert_eq!(list_price.description, "Measured in USD");

    let metric_exprs: Vec<_> = products.metrics.iter().map(|m| m.expr.as_str()).collect();
    assert_eq!(metric_exprs, vec!["sum(list_price)", "count(*)"]);

    // color + is_active exists filters, six windows for sellEndDate
    assert_eq!(products.filters.len(), 8);

    // entity and column test agree on the key; the entity copy wins
    assert_eq!(products.relationships.len(), 1);
    assert_eq!(products.relationships[0].name, "category_rel");
    assert_eq!(products.relationships[0].ref_col, "categories.category_id");

    let categories = &outcome.models[1];
    assert!(categories.metrics.is_empty());
    assert!(categories.filters.is_empty());
}

#[test]
fn test_failed_model_does_not_abort_file() {
    let outcome = transform(CATALOG_YAML);

    // orders_sm has a sum without expr: orders is dropped, siblings survive
    assert!(outcome.models.iter().all(|m| m.name != "orders"));
    assert!(outcome.has_errors());

    let orders_issues: Vec<_> = outcome.issues_for("orders").collect();
    assert_eq!(orders_issues.len(), 1);
    assert_eq!(orders_issues[0].code, IssueCode::ModelTransformFailed);
    assert!(orders_issues[0].message.contains("revenue"));

    // and the missing time dimension default is a file-level warning
    let file_level = outcome.issues.iter().find(|g| g.model.is_none()).unwrap();
    assert!(file_level
        .issues
        .iter()
        .any(|i| i.code == IssueCode::MissingAggTimeDimension && i.message.contains("agg_time_dimension")));
}

#[test]
fn test_one_output_per_model_name() {
    let outcome = transform(
        r#"
models:
  - name: orders
    columns:
      - name: order_id
      - name: amount
        data_type: decimal
semantic_models:
  - name: orders_sm
    model: ref('orders')
    defaults:
      agg_time_dimension: ordered_at
    dimensions:
      - name: ordered_at
        type: time
    measures:
      - name: total_amount
        agg: sum
        expr: amount
"#,
    );

    assert_eq!(outcome.models.len(), 1);
    assert_eq!(outcome.models[0].name, "orders");
    assert_eq!(outcome.models[0].metrics.len(), 1);
    assert!(outcome.issues.is_empty());
}

#[test]
fn test_relationship_precedence() {
    let outcome = transform(
        r#"
models:
  - name: customers
    columns:
      - name: id
  - name: orders
    columns:
      - name: customer_id
        tests:
          - relationships:
              to: ref('customers')
              field: id
      - name: store_id
        tests:
          - relationships:
              to: ref('stores')
              field: id
    relationships:
      - name: buyer
        source_col: customer_id
        ref_col: customers.id
        type: one_to_one
semantic_models:
  - name: orders_sm
    model: ref('orders')
    defaults:
      agg_time_dimension: ordered_at
    entities:
      - name: customer
        type: foreign
        expr: customer_id
"#,
    );

    let orders = outcome.models.iter().find(|m| m.name == "orders").unwrap();
    let rels: Vec<_> = orders
        .relationships
        .iter()
        .map(|r| (r.name.as_str(), r.ref_col.as_str()))
        .collect();

    assert_eq!(rels, vec![("buyer", "customers.id"), ("stores_rel", "stores.id")]);
    assert_eq!(orders.relationships[0].relationship_type, RelationshipType::OneToOne);
}

#[test]
fn test_primary_key_fallback_to_id() {
    let outcome = transform(
        r#"
models:
  - name: stores
    columns:
      - name: store_name
  - name: orders
semantic_models:
  - name: orders_sm
    model: ref('orders')
    entities:
      - name: store
        type: foreign
        expr: store_id
"#,
    );

    let orders = outcome.models.iter().find(|m| m.name == "orders").unwrap();
    assert_eq!(orders.relationships[0].ref_col, "stores.id");

    let issues: Vec<_> = outcome.issues_for("orders").collect();
    assert_eq!(issues[0].code, IssueCode::PrimaryKeyFallback);
    assert!(!issues[0].is_error());
}

#[test]
fn test_unknown_aggregation_fallback_passthrough() {
    let outcome = transform(
        r#"
semantic_models:
  - name: orders_sm
    model: ref('orders')
    defaults:
      agg_time_dimension: ordered_at
    measures:
      - name: amount_stddev
        agg: stddev
        expr: amount
"#,
    );

    assert_eq!(outcome.models[0].metrics[0].expr, "stddev(amount)");
}

#[test]
fn test_unresolved_entity_is_a_warning() {
    let outcome = transform(
        r#"
models:
  - name: orders
semantic_models:
  - name: orders_sm
    model: ref('orders')
    entities:
      - name: warehouse
        type: foreign
"#,
    );

    assert_eq!(outcome.models.len(), 1);
    assert!(outcome.models[0].relationships.is_empty());
    assert!(!outcome.has_errors());

    let issues: Vec<_> = outcome.issues_for("orders").collect();
    assert_eq!(issues[0].code, IssueCode::EntityUnresolved);
}

#[test]
fn test_source_with_todo_marker() {
    let err = transform_source("models:\n  - name: {{TODO}}\n", &Config::default()).unwrap_err();
    match err {
        TransformError::Load(load) => {
            assert_eq!(load.to_issues()[0].code, IssueCode::FileContainsTodo);
        }
        other => panic!("Expected load error, got {:?}", other),
    }
}

#[test]
fn test_empty_file_rejected() {
    let err = transform_source("models: []\nsemantic_models: []\n", &Config::default()).unwrap_err();
    assert!(err.to_string().contains("at least one model"));
}

#[test]
fn test_report_statistics() {
    let outcome = transform(CATALOG_YAML);
    let report = outcome.report();

    assert_eq!(report.stats.models, 2);
    assert_eq!(report.stats.metrics, 2);
    assert_eq!(report.stats.filters, 8);
    assert!(report.stats.errors >= 1);
    assert!(report.to_json().unwrap().contains("MODEL_TRANSFORM_FAILED"));
}
