//! Measure to metric synthesis

use busterdbt_core::Metric;
use busterdbt_dbt::{AggregationType, SemanticMeasure};

use crate::error::TransformError;

/// Build a metric whose expression aggregates the measure
///
/// Fails when an aggregation that needs an `expr` (everything but `count`)
/// has none, or when a percentile is missing or outside 0..=1. Unknown
/// aggregations pass through as `kind(expr)`.
pub fn measure_to_metric(measure: &SemanticMeasure) -> Result<Metric, TransformError> {
    let expr = measure
        .expr
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let required = || {
        expr.ok_or_else(|| TransformError::MissingExpr {
            measure: measure.name.clone(),
            agg: measure.agg.to_string(),
        })
    };

    let sql = match &measure.agg {
        AggregationType::Count => match expr {
            Some(e) => format!("count({})", e),
            None => "count(*)".to_string(),
        },
        AggregationType::CountDistinct => format!("count(distinct {})", required()?),
        AggregationType::Sum => format!("sum({})", required()?),
        AggregationType::Average => format!("average({})", required()?),
        AggregationType::Median => format!("median({})", required()?),
        AggregationType::Min => format!("min({})", required()?),
        AggregationType::Max => format!("max({})", required()?),
        AggregationType::Percentile => {
            let e = required()?;
            let p = percentile(measure)?;
            format!("percentile({}, {})", e, p)
        }
        AggregationType::SumBoolean => {
            format!("sum(case when {} then 1 else 0 end)", required()?)
        }
        AggregationType::Other(kind) => {
            tracing::debug!(
                measure = %measure.name,
                agg = %kind,
                "Unknown aggregation, passing through"
            );
            format!("{}({})", kind, expr.unwrap_or("*"))
        }
    };

    let description = measure
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default_description(&measure.agg, expr));

    Ok(Metric {
        name: measure.name.clone(),
        expr: sql,
        description,
        args: Vec::new(),
    })
}

fn percentile(measure: &SemanticMeasure) -> Result<f64, TransformError> {
    let value = measure
        .agg_params
        .as_ref()
        .and_then(|p| p.percentile)
        .ok_or_else(|| TransformError::MissingPercentile {
            measure: measure.name.clone(),
        })?;

    if !(0.0..=1.0).contains(&value) {
        return Err(TransformError::PercentileOutOfRange {
            measure: measure.name.clone(),
            value,
        });
    }

    Ok(value)
}

fn default_description(agg: &AggregationType, expr: Option<&str>) -> String {
    let label = match agg {
        AggregationType::Count => "Count",
        AggregationType::CountDistinct => "Distinct count",
        AggregationType::Sum => "Sum",
        AggregationType::Average => "Average",
        AggregationType::Median => "Median",
        AggregationType::Min => "Minimum",
        AggregationType::Max => "Maximum",
        AggregationType::Percentile => "Percentile",
        AggregationType::SumBoolean => "Number of true values",
        AggregationType::Other(kind) => kind.as_str(),
    };

    format!("{} of {}", label, expr.unwrap_or("rows"))
}
