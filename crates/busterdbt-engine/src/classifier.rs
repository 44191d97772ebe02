//! Column type classification
//!
//! Decides whether a column is a measure (numeric) or a dimension, and which
//! concrete type it gets. Each decision is an ordered list of named rules
//! evaluated top to bottom; the first rule that applies wins.
//!
//! Precedence: declared type > metadata hints > name heuristics >
//! description keywords > default (dimension).

use busterdbt_core::{DimensionType, MeasureType};
use busterdbt_dbt::RawColumn;

/// Normalized declared warehouse type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Integer,
    Decimal,
    Float,
    String,
    Datetime,
    Boolean,
}

impl DeclaredType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Float)
    }
}

/// Parse a declared `data_type` string
///
/// Parameters are ignored (`numeric(10,2)` is a decimal, `varchar(255)` a
/// string). Returns `None` for types the classifier has no opinion on.
pub fn parse_declared_type(data_type: &str) -> Option<DeclaredType> {
    let lower = data_type.trim().to_lowercase();
    let base = lower.split('(').next().unwrap_or("").trim();

    match base {
        // Integers
        "int" | "integer" | "bigint" | "smallint" | "tinyint" | "int2" | "int4" | "int8"
        | "int64" => Some(DeclaredType::Integer),

        // Decimals
        "decimal" | "numeric" | "number" | "money" => Some(DeclaredType::Decimal),

        // Floats
        "float" | "float4" | "float8" | "float64" | "double" | "double precision" | "real" => {
            Some(DeclaredType::Float)
        }

        // Strings
        "string" | "varchar" | "char" | "text" | "character varying" | "character"
        | "nvarchar" | "nchar" => Some(DeclaredType::String),

        // Booleans
        "bool" | "boolean" => Some(DeclaredType::Boolean),

        // Dates and timestamps
        "date" | "datetime" | "time" => Some(DeclaredType::Datetime),
        s if s.starts_with("timestamp") => Some(DeclaredType::Datetime),

        _ => None,
    }
}

/// Everything the rules look at, normalized once per column
#[derive(Debug, Clone)]
pub struct ColumnFacts {
    declared: Option<DeclaredType>,
    has_unit: bool,
    categorical_hint: bool,
    name_words: Vec<String>,
    description_words: Vec<String>,
}

impl ColumnFacts {
    pub fn from_column(column: &RawColumn) -> Self {
        let meta = column.meta();
        let has_options = column.options.as_ref().is_some_and(|o| o.is_sequence())
            || meta.and_then(|m| m.options()).is_some();

        Self {
            declared: column.data_type.as_deref().and_then(parse_declared_type),
            has_unit: meta.and_then(|m| m.unit()).is_some(),
            categorical_hint: meta.is_some_and(|m| m.is_categorical()) || has_options,
            name_words: split_identifier(&column.name),
            description_words: split_words(column.description_or_empty()),
        }
    }

    fn first_word_in(&self, words: &[&str]) -> bool {
        self.name_words
            .first()
            .is_some_and(|w| words.contains(&w.as_str()))
    }

    fn last_word_in(&self, words: &[&str]) -> bool {
        self.name_words
            .last()
            .is_some_and(|w| words.contains(&w.as_str()))
    }

    fn any_word_in(&self, words: &[&str]) -> bool {
        self.name_words.iter().any(|w| words.contains(&w.as_str()))
    }
}

/// A named (predicate, outcome) pair
pub struct Rule<T> {
    pub name: &'static str,
    pub applies: fn(&ColumnFacts) -> bool,
    pub outcome: T,
}

/// Evaluate rules top to bottom; the first that applies wins
pub fn first_match<T: Copy>(rules: &[Rule<T>], facts: &ColumnFacts) -> Option<(&'static str, T)> {
    rules
        .iter()
        .find(|rule| (rule.applies)(facts))
        .map(|rule| (rule.name, rule.outcome))
}

const NUMERIC_PREFIXES: &[&str] = &["count", "total", "sum", "avg", "max", "min", "num"];
const NUMERIC_SUFFIXES: &[&str] = &["amount", "price", "cost", "total", "quantity", "qty", "revenue", "count"];
const STRING_SUFFIXES: &[&str] = &["name", "title", "email", "status", "type", "category", "label"];
const BOOLEAN_PREFIXES: &[&str] = &["is", "has"];
const DATETIME_PREFIXES: &[&str] = &["created", "updated"];
const DATETIME_SUFFIXES: &[&str] = &["date", "at", "timestamp", "time"];
const NUMERIC_DESCRIPTION_WORDS: &[&str] = &["amount", "count", "total", "number", "sum", "quantity", "price"];

fn declared_numeric(f: &ColumnFacts) -> bool {
    f.declared.is_some_and(|d| d.is_numeric())
}

fn declared_non_numeric(f: &ColumnFacts) -> bool {
    f.declared.is_some_and(|d| !d.is_numeric())
}

fn declared_integer(f: &ColumnFacts) -> bool {
    f.declared == Some(DeclaredType::Integer)
}

fn declared_decimal(f: &ColumnFacts) -> bool {
    f.declared == Some(DeclaredType::Decimal)
}

fn declared_float(f: &ColumnFacts) -> bool {
    f.declared == Some(DeclaredType::Float)
}

fn declared_datetime(f: &ColumnFacts) -> bool {
    f.declared == Some(DeclaredType::Datetime)
}

fn declared_boolean(f: &ColumnFacts) -> bool {
    f.declared == Some(DeclaredType::Boolean)
}

fn declared_string(f: &ColumnFacts) -> bool {
    f.declared == Some(DeclaredType::String)
}

fn meta_unit(f: &ColumnFacts) -> bool {
    f.has_unit
}

fn meta_categorical(f: &ColumnFacts) -> bool {
    f.categorical_hint
}

fn identifier_name(f: &ColumnFacts) -> bool {
    f.last_word_in(&["id"])
}

fn numeric_name(f: &ColumnFacts) -> bool {
    f.first_word_in(NUMERIC_PREFIXES) || f.last_word_in(NUMERIC_SUFFIXES)
}

fn string_name(f: &ColumnFacts) -> bool {
    f.last_word_in(STRING_SUFFIXES)
}

fn boolean_name(f: &ColumnFacts) -> bool {
    f.name_words.len() > 1 && f.first_word_in(BOOLEAN_PREFIXES)
}

fn datetime_name(f: &ColumnFacts) -> bool {
    f.first_word_in(DATETIME_PREFIXES)
        || (f.name_words.len() > 1 && f.last_word_in(DATETIME_SUFFIXES))
        || f.any_word_in(&["date"])
}

fn counting_name(f: &ColumnFacts) -> bool {
    f.any_word_in(&["count"])
}

fn monetary_name(f: &ColumnFacts) -> bool {
    f.any_word_in(&["amount", "price", "cost", "total", "revenue"])
}

fn quantity_name(f: &ColumnFacts) -> bool {
    f.any_word_in(&["quantity", "qty"])
}

fn numeric_description(f: &ColumnFacts) -> bool {
    f.description_words
        .iter()
        .any(|w| NUMERIC_DESCRIPTION_WORDS.contains(&w.as_str()))
}

/// Rules deciding measure (`true`) vs dimension (`false`)
pub static NUMERIC_RULES: &[Rule<bool>] = &[
    Rule { name: "declared_numeric", applies: declared_numeric, outcome: true },
    Rule { name: "declared_non_numeric", applies: declared_non_numeric, outcome: false },
    Rule { name: "meta_unit", applies: meta_unit, outcome: true },
    Rule { name: "meta_categorical", applies: meta_categorical, outcome: false },
    Rule { name: "identifier_name", applies: identifier_name, outcome: false },
    Rule { name: "numeric_name", applies: numeric_name, outcome: true },
    Rule { name: "string_name", applies: string_name, outcome: false },
    Rule { name: "boolean_name", applies: boolean_name, outcome: false },
    Rule { name: "datetime_name", applies: datetime_name, outcome: false },
    Rule { name: "numeric_description", applies: numeric_description, outcome: true },
];

/// Rules picking the numeric subtype of a measure
pub static NUMERIC_TYPE_RULES: &[Rule<MeasureType>] = &[
    Rule { name: "declared_integer", applies: declared_integer, outcome: MeasureType::Integer },
    Rule { name: "declared_decimal", applies: declared_decimal, outcome: MeasureType::Decimal },
    Rule { name: "declared_float", applies: declared_float, outcome: MeasureType::Float },
    Rule { name: "counting_name", applies: counting_name, outcome: MeasureType::Integer },
    Rule { name: "monetary_name", applies: monetary_name, outcome: MeasureType::Decimal },
    Rule { name: "quantity_name", applies: quantity_name, outcome: MeasureType::Float },
];

/// Dimension type outcome; `DimensionType` itself is not `Copy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    String,
    Datetime,
    Boolean,
}

impl From<DimensionKind> for DimensionType {
    fn from(kind: DimensionKind) -> Self {
        match kind {
            DimensionKind::String => DimensionType::String,
            DimensionKind::Datetime => DimensionType::Datetime,
            DimensionKind::Boolean => DimensionType::Boolean,
        }
    }
}

/// Rules picking the type of a dimension
pub static DIMENSION_TYPE_RULES: &[Rule<DimensionKind>] = &[
    Rule { name: "declared_datetime", applies: declared_datetime, outcome: DimensionKind::Datetime },
    Rule { name: "declared_boolean", applies: declared_boolean, outcome: DimensionKind::Boolean },
    Rule { name: "declared_string", applies: declared_string, outcome: DimensionKind::String },
    Rule { name: "identifier_name", applies: identifier_name, outcome: DimensionKind::String },
    Rule { name: "string_name", applies: string_name, outcome: DimensionKind::String },
    Rule { name: "datetime_name", applies: datetime_name, outcome: DimensionKind::Datetime },
    Rule { name: "boolean_name", applies: boolean_name, outcome: DimensionKind::Boolean },
];

/// Whether the column should become a measure
pub fn is_numeric_column(column: &RawColumn) -> bool {
    let facts = ColumnFacts::from_column(column);
    first_match(NUMERIC_RULES, &facts)
        .map(|(_, numeric)| numeric)
        .unwrap_or(false)
}

/// Numeric subtype for a measure column; unclassified columns are floats
pub fn infer_numeric_type(column: &RawColumn) -> MeasureType {
    let facts = ColumnFacts::from_column(column);
    first_match(NUMERIC_TYPE_RULES, &facts)
        .map(|(_, t)| t)
        .unwrap_or(MeasureType::Float)
}

/// Type for a dimension column; unclassified columns are strings
pub fn infer_dimension_type(column: &RawColumn) -> DimensionType {
    let facts = ColumnFacts::from_column(column);
    first_match(DIMENSION_TYPE_RULES, &facts)
        .map(|(_, kind)| kind.into())
        .unwrap_or(DimensionType::String)
}

/// Split an identifier into lowercase words on `_`, `-`, spaces and camelCase humps
fn split_identifier(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in name.trim().chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }

        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }

        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// Split free text into lowercase alphanumeric words
fn split_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
