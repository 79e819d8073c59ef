//! Chart-ready views of a [`Report`].
//!
//! Each chart is a flat list of points, one bar each, so a renderer only has
//! to group by `period_label` along the x axis and colour by `series`.

use serde::{Deserialize, Serialize};

use super::types::{AggregatedBucket, Report};
use crate::error::{Error, Result};

/// What the bars measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartValues {
    /// Each department's percentage of the period total.
    #[default]
    Shares,
    /// Summed metric values.
    Counts,
}

impl std::str::FromStr for ChartValues {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "shares" | "share" | "percent" => Ok(Self::Shares),
            "counts" | "count" | "totals" => Ok(Self::Counts),
            other => Err(Error::Config(format!(
                "chart values must be 'shares' or 'counts', got '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ChartValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shares => write!(f, "shares"),
            Self::Counts => write!(f, "counts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub period_key: String,
    pub period_label: String,
    pub department: String,
    pub series: String,
    /// Summed metric value for the department and period.
    pub total: f64,
    /// Percentage share; `None` when the period total was zero.
    pub share: Option<f64>,
    /// Bar height: the share or the total, depending on the chart.
    pub value: Option<f64>,
    /// Bar annotation, e.g. `25.00%` or `12`.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub values: ChartValues,
    /// Draw one panel per department instead of colouring by it.
    pub facet_by_department: bool,
    pub points: Vec<ChartPoint>,
}

/// One chart per requested metric, then the comparison chart.
pub fn charts(report: &Report, values: ChartValues) -> Vec<Chart> {
    report
        .metrics
        .iter()
        .map(|metric| metric_chart(report, metric, values))
        .chain(std::iter::once(comparison_chart(report, values)))
        .collect()
}

/// `metric` per period, one series per department.
pub fn metric_chart(report: &Report, metric: &str, values: ChartValues) -> Chart {
    let points = report
        .buckets
        .iter()
        .map(|b| point(b, metric, b.department.clone(), values))
        .collect();
    let (title, y_label) = match values {
        ChartValues::Shares => (
            format!("{metric} Percentage by {}", report.granularity),
            format!("{metric} (%)"),
        ),
        ChartValues::Counts => (
            format!("{metric} by {}", report.granularity),
            format!("Total {metric}"),
        ),
    };
    Chart {
        title,
        x_label: report.granularity.to_string(),
        y_label,
        values,
        facet_by_department: false,
        points,
    }
}

/// Every metric side by side, one series per metric.
///
/// Shares compare the metrics across all departments at once; counts are
/// split into one panel per department.
pub fn comparison_chart(report: &Report, values: ChartValues) -> Chart {
    let points = report
        .metrics
        .iter()
        .flat_map(|metric| {
            report
                .buckets
                .iter()
                .map(move |b| point(b, metric, metric.clone(), values))
        })
        .collect();

    let (title, y_label) = match values {
        ChartValues::Shares => {
            let names: Vec<&str> = report.metrics.iter().rev().map(String::as_str).collect();
            (
                format!(
                    "Comparison of {} Percentages by {}",
                    join_names(&names),
                    report.granularity
                ),
                "Percentage (%)".to_string(),
            )
        }
        ChartValues::Counts => {
            let names: Vec<&str> = report.metrics.iter().map(String::as_str).collect();
            (
                format!(
                    "Comparison of {} by {}",
                    join_names(&names),
                    report.granularity
                ),
                "Count".to_string(),
            )
        }
    };
    Chart {
        title,
        x_label: report.granularity.to_string(),
        y_label,
        values,
        facet_by_department: values == ChartValues::Counts,
        points,
    }
}

fn point(
    bucket: &AggregatedBucket,
    metric: &str,
    series: String,
    values: ChartValues,
) -> ChartPoint {
    let total = bucket.total(metric);
    let share = bucket.share(metric);
    let (value, text) = match values {
        ChartValues::Shares => (share, format_share(share)),
        ChartValues::Counts => (Some(total), total.to_string()),
    };
    ChartPoint {
        period_key: bucket.period.to_key(),
        period_label: bucket.period_label.clone(),
        department: bucket.department.clone(),
        series,
        total,
        share,
        value,
        text,
    }
}

pub fn format_share(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}%"),
        None => "n/a".into(),
    }
}

/// `A`, `A and B`, `A, B and C`.
fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
