//! Buster model types
//!
//! The unified output of a transformation: one [`OutputModel`] per source
//! model, carrying dimensions, measures, metrics, filters and relationships.

use serde::{Deserialize, Serialize};

/// Dimension type vocabulary
///
/// `categorical` is accepted on input but always normalized to
/// [`DimensionType::String`]; any other unrecognized type passes through
/// unchanged as [`DimensionType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DimensionType {
    /// Text / categorical attribute
    String,

    /// MetricFlow time dimension
    Time,

    /// Date or timestamp column
    Datetime,

    /// True/false attribute
    Boolean,

    /// Any other type, kept verbatim
    Other(String),
}

impl DimensionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Time => "time",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for DimensionType {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "string" | "categorical" => Self::String,
            "time" => Self::Time,
            "datetime" => Self::Datetime,
            "boolean" => Self::Boolean,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl From<String> for DimensionType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<DimensionType> for String {
    fn from(value: DimensionType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for DimensionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric subtype of a measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureType {
    Integer,
    Decimal,
    Float,
}

impl std::fmt::Display for MeasureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Decimal => write!(f, "decimal"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// A scalar option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// One allowed value of a dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// `{ value, description? }`
    Valued {
        value: PrimitiveValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// Bare scalar
    Primitive(PrimitiveValue),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Primitive(value.into())
    }
}

/// A non-aggregatable descriptive attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub dimension_type: DimensionType,

    #[serde(default)]
    pub searchable: bool,

    /// Allowed values, omitted when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionValue>>,

    /// Only set for time dimensions carrying a semantic granularity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_granularity: Option<String>,
}

impl Dimension {
    /// Create a dimension with no description, options or granularity
    pub fn new(name: impl Into<String>, dimension_type: DimensionType) -> Self {
        Self {
            name: name.into(),
            description: None,
            dimension_type,
            searchable: false,
            options: None,
            time_granularity: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Set options; an empty list leaves options unset
    pub fn with_options(mut self, options: Vec<OptionValue>) -> Self {
        self.options = if options.is_empty() { None } else { Some(options) };
        self
    }
}

/// A raw aggregatable numeric column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub measure_type: MeasureType,
}

/// A typed argument of a metric or filter expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,

    #[serde(rename = "type")]
    pub arg_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named, pre-aggregated computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub expr: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub args: Vec<Argument>,
}

/// A named reusable boolean predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub expr: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub args: Vec<Argument>,
}

/// Relationship kind between two models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl Default for RelationshipType {
    fn default() -> Self {
        Self::ManyToOne
    }
}

/// Whether the referenced row must exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Optional,
    Required,
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::Optional
    }
}

/// A foreign-key-like link from one model's column to another model's column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub source_col: String,

    /// `targetModel.targetColumn`
    pub ref_col: String,

    #[serde(rename = "type", default)]
    pub relationship_type: RelationshipType,

    #[serde(default)]
    pub cardinality: Cardinality,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Relationship {
    /// Create an optional many-to-one relationship
    pub fn new(
        name: impl Into<String>,
        source_col: impl Into<String>,
        ref_col: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_col: source_col.into(),
            ref_col: ref_col.into(),
            relationship_type: RelationshipType::ManyToOne,
            cardinality: Cardinality::Optional,
            description: None,
        }
    }

    pub fn with_type(mut self, relationship_type: RelationshipType) -> Self {
        self.relationship_type = relationship_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Identity used for deduplication: `source_col→ref_col`
    pub fn key(&self) -> String {
        format!("{}→{}", self.source_col, self.ref_col)
    }
}

/// A complete Buster model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputModel {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub dimensions: Vec<Dimension>,

    #[serde(default)]
    pub measures: Vec<Measure>,

    #[serde(default)]
    pub metrics: Vec<Metric>,

    #[serde(default)]
    pub filters: Vec<Filter>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,

    /// Open questions for a human reviewer; always empty when generated
    #[serde(default)]
    pub clarifications: Vec<String>,
}

impl OutputModel {
    /// Create an empty model
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            dimensions: Vec::new(),
            measures: Vec::new(),
            metrics: Vec::new(),
            filters: Vec::new(),
            relationships: Vec::new(),
            clarifications: Vec::new(),
        }
    }

    /// Find a dimension by name
    pub fn find_dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Find a measure by name
    pub fn find_measure(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_normalizes_to_string() {
        assert_eq!(DimensionType::from("categorical"), DimensionType::String);
        assert_eq!(DimensionType::from("CATEGORICAL"), DimensionType::String);
        assert_eq!(DimensionType::from("time"), DimensionType::Time);
        assert_eq!(
            DimensionType::from("geography"),
            DimensionType::Other("geography".to_string())
        );
    }

    #[test]
    fn dimension_type_serializes_as_plain_string() {
        let dim = Dimension::new("status", DimensionType::String);
        let json = serde_json::to_value(&dim).unwrap();
        assert_eq!(json["type"], "string");
        assert!(json.get("options").is_none());
        assert!(json.get("time_granularity").is_none());
    }

    #[test]
    fn empty_options_are_dropped() {
        let dim = Dimension::new("color", DimensionType::String).with_options(Vec::new());
        assert!(dim.options.is_none());
    }

    #[test]
    fn mixed_options_deserialize_in_order() {
        let options: Vec<OptionValue> =
            serde_json::from_str(r#"["Red", 3, true, {"value": "B", "description": "Blue"}]"#)
                .unwrap();

        assert_eq!(options[0], OptionValue::from("Red"));
        assert_eq!(options[1], OptionValue::Primitive(PrimitiveValue::Integer(3)));
        assert_eq!(options[2], OptionValue::Primitive(PrimitiveValue::Bool(true)));
        assert_eq!(
            options[3],
            OptionValue::Valued {
                value: PrimitiveValue::from("B"),
                description: Some("Blue".to_string()),
            }
        );
    }

    #[test]
    fn relationship_defaults() {
        let rel = Relationship::new("customer_rel", "customer_id", "customers.id");
        assert_eq!(rel.relationship_type, RelationshipType::ManyToOne);
        assert_eq!(rel.cardinality, Cardinality::Optional);
        assert_eq!(rel.key(), "customer_id→customers.id");

        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "many_to_one");
        assert_eq!(json["cardinality"], "optional");
    }
}
