//! dbt schema YAML structures
//!
//! Models with their columns plus the MetricFlow `semantic_models` layer
//! (subset of fields we care about).

use busterdbt_core::{Cardinality, Relationship, RelationshipType};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::refs::extract_model_name_from_ref;

/// Root of a dbt schema file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbtFile {
    /// Schema file version (dbt uses `2`)
    #[serde(default)]
    pub version: Option<u32>,

    /// Plain model definitions
    #[serde(default, deserialize_with = "null_as_default")]
    pub models: Vec<RawModel>,

    /// MetricFlow semantic models
    #[serde(default, deserialize_with = "null_as_default")]
    pub semantic_models: Vec<RawSemanticModel>,
}

impl DbtFile {
    /// Parse a dbt schema file from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Get a plain model by exact name
    pub fn find_model(&self, name: &str) -> Option<&RawModel> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Get the semantic model built on top of `model_name`, if any
    pub fn semantic_model_for(&self, model_name: &str) -> Option<&RawSemanticModel> {
        self.semantic_models
            .iter()
            .find(|sm| sm.base_model_name().eq_ignore_ascii_case(model_name))
    }
}

/// A model declaration (`models:` entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawModel {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<RawColumn>,

    /// Model-level relationship declarations (not part of stock dbt)
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: Vec<RawRelationship>,
}

impl RawModel {
    /// Find a column by case-insensitive name
    pub fn find_column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// A column declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Declared warehouse type
    #[serde(default, alias = "type")]
    pub data_type: Option<String>,

    /// Column-level meta (older dbt placement)
    #[serde(default)]
    pub meta: Option<ColumnMeta>,

    #[serde(default)]
    pub config: Option<ColumnConfig>,

    /// Top-level searchable flag; wins over `config.meta.searchable`
    #[serde(default)]
    pub searchable: Option<Value>,

    /// Top-level options list; wins over `config.meta.options`
    #[serde(default)]
    pub options: Option<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tests: Vec<ColumnTest>,

    /// dbt 1.8+ spelling of `tests`
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_tests: Vec<ColumnTest>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub constraints: Vec<ColumnConstraint>,
}

impl RawColumn {
    /// Create a bare column (used heavily by tests)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            data_type: None,
            meta: None,
            config: None,
            searchable: None,
            options: None,
            tests: Vec::new(),
            data_tests: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// The metadata bag: `config.meta`, falling back to column-level `meta`
    pub fn meta(&self) -> Option<&ColumnMeta> {
        self.config
            .as_ref()
            .and_then(|c| c.meta.as_ref())
            .or(self.meta.as_ref())
    }

    /// Description or empty string
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// All attached tests (`tests` then `data_tests`)
    pub fn all_tests(&self) -> impl Iterator<Item = &ColumnTest> {
        self.tests.iter().chain(self.data_tests.iter())
    }

    /// Whether a test with the given name is attached
    pub fn has_test(&self, name: &str) -> bool {
        self.all_tests().any(|t| t.name() == Some(name))
    }

    /// Whether a primary key constraint is declared
    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| c.constraint_type.eq_ignore_ascii_case("primary_key"))
    }
}

/// Column `config:` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub meta: Option<ColumnMeta>,
}

/// The nested metadata bag
///
/// Values are kept loosely typed so an unexpected scalar never fails the
/// whole file; accessors apply the type checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    #[serde(default)]
    pub searchable: Option<Value>,

    #[serde(default)]
    pub options: Option<Value>,

    #[serde(default)]
    pub unit: Option<Value>,

    #[serde(default)]
    pub categorical: Option<Value>,
}

impl ColumnMeta {
    /// `searchable`, only when it is a boolean
    pub fn searchable(&self) -> Option<bool> {
        self.searchable.as_ref().and_then(Value::as_bool)
    }

    /// `options` as a list, only when present as a sequence
    pub fn options(&self) -> Option<&Vec<Value>> {
        self.options.as_ref().and_then(Value::as_sequence)
    }

    /// `unit` rendered as a string (numbers are accepted)
    pub fn unit(&self) -> Option<String> {
        self.unit.as_ref().and_then(scalar_to_string)
    }

    /// `categorical: true`
    pub fn is_categorical(&self) -> bool {
        self.categorical.as_ref().and_then(Value::as_bool) == Some(true)
    }
}

/// A column test: bare name, `relationships`, or another structured test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnTest {
    /// `- unique`
    Named(String),

    /// `- relationships: { to: ref('x'), field: id }`
    Relationships { relationships: RelationshipTest },

    /// `- accepted_values: {...}` and friends
    Other(serde_yaml::Mapping),
}

impl ColumnTest {
    /// The test's name (`unique`, `not_null`, `relationships`, ...)
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name.as_str()),
            Self::Relationships { .. } => Some("relationships"),
            Self::Other(mapping) => mapping.keys().next().and_then(Value::as_str),
        }
    }
}

/// Arguments of a `relationships` test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTest {
    #[serde(default)]
    pub to: Option<String>,

    #[serde(default)]
    pub field: Option<String>,

    /// dbt 1.10 nests test arguments under `arguments:`
    #[serde(default)]
    pub arguments: Option<RelationshipTestArguments>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTestArguments {
    #[serde(default)]
    pub to: Option<String>,

    #[serde(default)]
    pub field: Option<String>,
}

impl RelationshipTest {
    /// Target reference, either top-level or under `arguments`
    pub fn target(&self) -> Option<&str> {
        self.to
            .as_deref()
            .or_else(|| self.arguments.as_ref().and_then(|a| a.to.as_deref()))
    }

    /// Target column, either top-level or under `arguments`
    pub fn target_field(&self) -> Option<&str> {
        self.field
            .as_deref()
            .or_else(|| self.arguments.as_ref().and_then(|a| a.field.as_deref()))
    }
}

/// A column constraint (`- type: primary_key`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConstraint {
    #[serde(rename = "type")]
    pub constraint_type: String,
}

/// A model-level relationship declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelationship {
    #[serde(default)]
    pub name: Option<String>,

    pub source_col: String,

    /// `targetModel.targetColumn`
    pub ref_col: String,

    #[serde(default, rename = "type")]
    pub relationship_type: Option<RelationshipType>,

    #[serde(default)]
    pub cardinality: Option<Cardinality>,

    #[serde(default)]
    pub description: Option<String>,
}

impl RawRelationship {
    /// Convert to an output relationship, defaulting type and cardinality
    pub fn to_relationship(&self) -> Relationship {
        let name = self.name.clone().unwrap_or_else(|| {
            let target = self.ref_col.split('.').next().unwrap_or(&self.ref_col);
            format!("{}_rel", target)
        });

        Relationship {
            name,
            source_col: self.source_col.clone(),
            ref_col: self.ref_col.clone(),
            relationship_type: self.relationship_type.unwrap_or_default(),
            cardinality: self.cardinality.unwrap_or_default(),
            description: self.description.clone(),
        }
    }
}

/// A MetricFlow semantic model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSemanticModel {
    pub name: String,

    /// `ref('model')` reference to the underlying model
    pub model: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: Vec<Entity>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub dimensions: Vec<SemanticDimension>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub measures: Vec<SemanticMeasure>,

    #[serde(default)]
    pub defaults: Option<SemanticDefaults>,
}

impl RawSemanticModel {
    /// Name of the model this semantic model is built on
    pub fn base_model_name(&self) -> String {
        extract_model_name_from_ref(&self.model)
    }

    /// The primary entity, if declared
    pub fn primary_entity(&self) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.entity_type == EntityType::Primary)
    }

    /// `defaults.agg_time_dimension`
    pub fn agg_time_dimension(&self) -> Option<&str> {
        self.defaults
            .as_ref()
            .and_then(|d| d.agg_time_dimension.as_deref())
    }
}

/// Role of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Primary,
    Foreign,
    Unique,
    Natural,
}

/// A semantic-layer key declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,

    #[serde(rename = "type")]
    pub entity_type: EntityType,

    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub expr: Option<String>,
}

impl Entity {
    /// The key column: `expr`, else the entity name
    pub fn column(&self) -> &str {
        self.expr.as_deref().unwrap_or(&self.name)
    }
}

/// A semantic dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticDimension {
    pub name: String,

    /// `categorical`, `time`, ...
    #[serde(default, rename = "type")]
    pub dimension_type: Option<String>,

    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub expr: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub type_params: Option<DimensionTypeParams>,
}

impl SemanticDimension {
    /// Create a bare dimension (used heavily by tests)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension_type: None,
            expr: None,
            description: None,
            type_params: None,
        }
    }

    /// The SQL the dimension selects: `expr`, else its name
    pub fn column(&self) -> &str {
        self.expr.as_deref().unwrap_or(&self.name)
    }

    /// `type_params.time_granularity`
    pub fn time_granularity(&self) -> Option<&str> {
        self.type_params
            .as_ref()
            .and_then(|p| p.time_granularity.as_deref())
    }

    pub fn is_time(&self) -> bool {
        self.dimension_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("time"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionTypeParams {
    #[serde(default)]
    pub time_granularity: Option<String>,
}

/// MetricFlow aggregation kind
///
/// Unknown kinds are kept as [`AggregationType::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregationType {
    Count,
    CountDistinct,
    Sum,
    Average,
    Median,
    Min,
    Max,
    Percentile,
    SumBoolean,
    Other(String),
}

impl AggregationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Count => "count",
            Self::CountDistinct => "count_distinct",
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Percentile => "percentile",
            Self::SumBoolean => "sum_boolean",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for AggregationType {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "count" => Self::Count,
            "count_distinct" => Self::CountDistinct,
            "sum" => Self::Sum,
            "average" => Self::Average,
            "median" => Self::Median,
            "min" => Self::Min,
            "max" => Self::Max,
            "percentile" => Self::Percentile,
            "sum_boolean" => Self::SumBoolean,
            _ => Self::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for AggregationType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<AggregationType> for String {
    fn from(value: AggregationType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for AggregationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantic measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMeasure {
    pub name: String,

    pub agg: AggregationType,

    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub expr: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub agg_params: Option<AggregationParams>,
}

impl SemanticMeasure {
    pub fn new(name: impl Into<String>, agg: AggregationType) -> Self {
        Self {
            name: name.into(),
            agg,
            expr: None,
            description: None,
            agg_params: None,
        }
    }

    pub fn with_expr(mut self, expr: impl Into<String>) -> Self {
        self.expr = Some(expr.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationParams {
    #[serde(default)]
    pub percentile: Option<f64>,

    #[serde(default)]
    pub use_discrete_percentile: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticDefaults {
    #[serde(default)]
    pub agg_time_dimension: Option<String>,
}

/// Render a YAML scalar as a string; `None` for null, sequences and mappings
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Treat an explicit `~` like an absent key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `expr: amount` as well as `expr: 1`
fn optional_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => scalar_to_string(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a string or number expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS_YAML: &str = r#"
version: 2
models:
  - name: orders
    description: All orders
    columns:
      - name: order_id
        data_tests: [unique, not_null]
      - name: customer_id
        tests:
          - relationships:
              to: ref('customers')
              field: id
      - name: amount
        data_type: numeric(10,2)
        config:
          meta:
            unit: USD
semantic_models:
  - name: orders_sm
    model: ref('orders')
    defaults:
      agg_time_dimension: ordered_at
    entities:
      - name: order
        type: primary
        expr: order_id
    dimensions:
      - name: ordered_at
        type: time
        type_params:
          time_granularity: day
    measures:
      - name: order_count
        agg: count
        expr: 1
      - name: p90_amount
        agg: percentile
        expr: amount
        agg_params:
          percentile: 0.9
"#;

    #[test]
    fn parse_orders_file() {
        let file = DbtFile::from_yaml(ORDERS_YAML).unwrap();
        assert_eq!(file.version, Some(2));

        let orders = file.find_model("orders").unwrap();
        assert_eq!(orders.columns.len(), 3);

        let order_id = orders.find_column("ORDER_ID").unwrap();
        assert!(order_id.has_test("unique"));
        assert!(order_id.has_test("not_null"));

        let customer_id = orders.find_column("customer_id").unwrap();
        match customer_id.all_tests().next().unwrap() {
            ColumnTest::Relationships { relationships } => {
                assert_eq!(relationships.target(), Some("ref('customers')"));
                assert_eq!(relationships.target_field(), Some("id"));
            }
            other => panic!("Expected relationships test, got {:?}", other),
        }

        let amount = orders.find_column("amount").unwrap();
        assert_eq!(amount.meta().unwrap().unit(), Some("USD".to_string()));
    }

    #[test]
    fn parse_semantic_model() {
        let file = DbtFile::from_yaml(ORDERS_YAML).unwrap();
        let sm = &file.semantic_models[0];

        assert_eq!(sm.base_model_name(), "orders");
        assert_eq!(sm.primary_entity().unwrap().column(), "order_id");
        assert_eq!(sm.agg_time_dimension(), Some("ordered_at"));
        assert_eq!(sm.dimensions[0].time_granularity(), Some("day"));
        assert!(sm.dimensions[0].is_time());

        // numeric expr is accepted as text
        assert_eq!(sm.measures[0].expr.as_deref(), Some("1"));
        assert_eq!(sm.measures[1].agg, AggregationType::Percentile);
        assert_eq!(sm.measures[1].agg_params.as_ref().unwrap().percentile, Some(0.9));

        assert!(file.semantic_model_for("orders").is_some());
    }

    #[test]
    fn unknown_aggregation_is_kept() {
        assert_eq!(
            AggregationType::from("stddev"),
            AggregationType::Other("stddev".to_string())
        );
        assert_eq!(AggregationType::from("SUM"), AggregationType::Sum);
    }

    #[test]
    fn structured_test_names() {
        let yaml = r#"
name: status
tests:
  - accepted_values:
      values: [open, closed]
  - not_null
constraints:
  - type: primary_key
"#;
        let column: RawColumn = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<_> = column.all_tests().filter_map(ColumnTest::name).collect();
        assert_eq!(names, vec!["accepted_values", "not_null"]);
        assert!(column.is_primary_key());
    }

    #[test]
    fn meta_prefers_config_block() {
        let yaml = r#"
name: color
meta:
  searchable: false
config:
  meta:
    searchable: true
    categorical: true
"#;
        let column: RawColumn = serde_yaml::from_str(yaml).unwrap();
        let meta = column.meta().unwrap();
        assert_eq!(meta.searchable(), Some(true));
        assert!(meta.is_categorical());
    }

    #[test]
    fn raw_relationship_defaults() {
        let raw = RawRelationship {
            name: None,
            source_col: "customer_id".to_string(),
            ref_col: "customers.id".to_string(),
            relationship_type: None,
            cardinality: None,
            description: None,
        };

        let rel = raw.to_relationship();
        assert_eq!(rel.name, "customers_rel");
        assert_eq!(rel.relationship_type, RelationshipType::ManyToOne);
        assert_eq!(rel.cardinality, Cardinality::Optional);
    }
}
