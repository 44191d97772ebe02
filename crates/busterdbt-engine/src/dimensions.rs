//! Dimension merger
//!
//! Reconciles column-derived dimensions with semantic dimensions. Matching is
//! by name or by a simple `expr` naming the column; semantic dimensions with
//! complex expressions never merge and are always emitted on their own.

use busterdbt_core::{Dimension, DimensionType};
use busterdbt_dbt::SemanticDimension;
use once_cell::sync::Lazy;
use regex::Regex;

static SQL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(CASE|WHEN|THEN|ELSE|END|CAST|COALESCE|NULLIF|CONCAT|SUBSTRING|DATE_TRUNC|EXTRACT)\b",
    )
    .expect("valid regex")
});

static ARITHMETIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[+\-*/]|\|\|").expect("valid regex"));

static BOOLEAN_CONNECTIVES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(AND|OR|NOT)\b").expect("valid regex"));

static COMPARISONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)!=|<>|=|>|<|\bIS\s+(NOT\s+)?NULL\b").expect("valid regex")
});

/// Whether a semantic `expr` is more than a bare column reference
pub fn is_complex_expression(expr: &str) -> bool {
    let expr = expr.trim();
    if expr.is_empty() {
        return false;
    }

    SQL_KEYWORDS.is_match(expr)
        || ARITHMETIC.is_match(expr)
        || BOOLEAN_CONNECTIVES.is_match(expr)
        || COMPARISONS.is_match(expr)
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn has_complex_expr(semantic: &SemanticDimension) -> bool {
    semantic.expr.as_deref().is_some_and(is_complex_expression)
}

/// Whether a column dimension and a semantic dimension describe the same field
pub fn dimensions_match(column: &Dimension, semantic: &SemanticDimension) -> bool {
    if has_complex_expr(semantic) {
        return false;
    }

    let column_name = normalize(&column.name);
    if column_name == normalize(&semantic.name) {
        return true;
    }

    semantic
        .expr
        .as_deref()
        .is_some_and(|expr| normalize(expr) == column_name)
}

/// Output type of a semantic dimension; untyped ones are strings
fn semantic_type(semantic: &SemanticDimension) -> Option<DimensionType> {
    semantic.dimension_type.as_deref().map(DimensionType::from)
}

/// Convert a semantic dimension on its own
pub fn semantic_to_dimension(semantic: &SemanticDimension) -> Dimension {
    Dimension {
        name: semantic.name.clone(),
        description: semantic.description.clone(),
        dimension_type: semantic_type(semantic).unwrap_or(DimensionType::String),
        searchable: false,
        options: None,
        time_granularity: semantic.time_granularity().map(str::to_string),
    }
}

/// Merge a matched pair; the column keeps its name and its searchable/options
fn merge_pair(column: &Dimension, semantic: &SemanticDimension) -> Dimension {
    let description = match column.description.as_deref() {
        Some(d) if !d.is_empty() => column.description.clone(),
        _ => semantic.description.clone().or_else(|| column.description.clone()),
    };

    Dimension {
        name: column.name.clone(),
        description,
        dimension_type: semantic_type(semantic).unwrap_or_else(|| column.dimension_type.clone()),
        searchable: column.searchable,
        options: column.options.clone(),
        time_granularity: semantic.time_granularity().map(str::to_string),
    }
}

/// Merge column dimensions with semantic dimensions
///
/// Semantic order comes first, then every unmatched column dimension in its
/// original order.
pub fn merge_dimensions(columns: &[Dimension], semantics: &[SemanticDimension]) -> Vec<Dimension> {
    let mut consumed = vec![false; columns.len()];
    let mut result = Vec::with_capacity(columns.len() + semantics.len());

    for semantic in semantics {
        if has_complex_expr(semantic) {
            tracing::debug!(
                dimension = %semantic.name,
                "Keeping complex expression dimension standalone"
            );
            result.push(semantic_to_dimension(semantic));
            continue;
        }

        let matched = columns
            .iter()
            .enumerate()
            .find(|(i, column)| !consumed[*i] && dimensions_match(column, semantic));

        match matched {
            Some((i, column)) => {
                consumed[i] = true;
                result.push(merge_pair(column, semantic));
            }
            None => result.push(semantic_to_dimension(semantic)),
        }
    }

    result.extend(
        columns
            .iter()
            .zip(consumed)
            .filter(|(_, used)| !used)
            .map(|(column, _)| column.clone()),
    );

    result
}
