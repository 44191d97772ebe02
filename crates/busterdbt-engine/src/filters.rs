//! Dimension to filter synthesis, plus the custom filter builder

use busterdbt_core::{Argument, Filter};
use busterdbt_dbt::SemanticDimension;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TransformError;

/// `{{name}}` placeholders inside a custom filter expression
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"));

/// (suffix, label, template) for time dimensions; `{expr}` is substituted
const TIME_FILTERS: &[(&str, &str, &str)] = &[
    ("last_7_days", "in the last 7 days", "{expr} >= CURRENT_DATE - INTERVAL '7 days'"),
    ("last_30_days", "in the last 30 days", "{expr} >= CURRENT_DATE - INTERVAL '30 days'"),
    ("last_90_days", "in the last 90 days", "{expr} >= CURRENT_DATE - INTERVAL '90 days'"),
    ("ytd", "year to date", "{expr} >= DATE_TRUNC('year', CURRENT_DATE)"),
    (
        "current_month",
        "in the current month",
        "DATE_TRUNC('month', {expr}) = DATE_TRUNC('month', CURRENT_DATE)",
    ),
    (
        "current_quarter",
        "in the current quarter",
        "DATE_TRUNC('quarter', {expr}) = DATE_TRUNC('quarter', CURRENT_DATE)",
    ),
];

/// Expand a semantic dimension into its canned filters
///
/// Time dimensions get six date-window filters; everything else gets a
/// single `<name>_exists` filter.
pub fn dimension_to_filters(dimension: &SemanticDimension) -> Vec<Filter> {
    let expr = dimension.column();
    let subject = dimension
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(&dimension.name);

    if dimension.is_time() {
        TIME_FILTERS
            .iter()
            .map(|(suffix, label, template)| Filter {
                name: format!("{}_{}", dimension.name, suffix),
                expr: template.replace("{expr}", expr),
                description: format!("{} {}", subject, label),
                args: Vec::new(),
            })
            .collect()
    } else {
        vec![Filter {
            name: format!("{}_exists", dimension.name),
            expr: format!("{} IS NOT NULL", expr),
            description: format!("{} is present", subject),
            args: Vec::new(),
        }]
    }
}

/// Build a parameterized filter
///
/// Every `{{placeholder}}` in `expr` must name one of `args`.
pub fn create_custom_filter(
    name: impl Into<String>,
    expr: impl Into<String>,
    args: Vec<Argument>,
    description: Option<String>,
) -> Result<Filter, TransformError> {
    let name = name.into();
    let expr = expr.into();

    for caps in PLACEHOLDER.captures_iter(&expr) {
        let placeholder = &caps[1];
        if !args.iter().any(|a| a.name == placeholder) {
            return Err(TransformError::UnknownPlaceholder {
                filter: name,
                placeholder: placeholder.to_string(),
            });
        }
    }

    Ok(Filter {
        description: description.unwrap_or_else(|| name.clone()),
        name,
        expr,
        args,
    })
}
