use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::period::{Granularity, PeriodKey};

/// Parameters of one report-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub granularity: Granularity,
    /// Exact-date filter; only honoured for daily reports.
    pub date: Option<NaiveDate>,
    /// Metrics charted as percentage shares, in chart order.
    pub metrics: Vec<String>,
}

impl ReportRequest {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            date: None,
            metrics: vec!["ODOI".into(), "CHECK IN".into()],
        }
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }
}

/// Summed values for one department within one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedBucket {
    pub period: PeriodKey,
    pub period_label: String,
    pub department: String,
    /// Every numeric column, summed.
    pub totals: BTreeMap<String, f64>,
    /// Share of the period total per requested metric, in percent.
    /// `None` when the period total is zero.
    pub shares: BTreeMap<String, Option<f64>>,
}

impl AggregatedBucket {
    pub fn total(&self, metric: &str) -> f64 {
        self.totals.get(metric).copied().unwrap_or(0.0)
    }

    pub fn share(&self, metric: &str) -> Option<f64> {
        self.shares.get(metric).copied().flatten()
    }
}

/// Aggregated buckets for one request, ordered by period then department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub granularity: Granularity,
    pub date: Option<NaiveDate>,
    /// Requested metrics, resolved to the dataset's column names.
    pub metrics: Vec<String>,
    pub buckets: Vec<AggregatedBucket>,
}

impl Report {
    /// Distinct periods in chronological order.
    pub fn periods(&self) -> Vec<PeriodKey> {
        let mut periods: Vec<PeriodKey> = self.buckets.iter().map(|b| b.period).collect();
        periods.dedup();
        periods
    }

    /// Buckets belonging to one period.
    pub fn period_buckets(&self, period: PeriodKey) -> impl Iterator<Item = &AggregatedBucket> + '_ {
        self.buckets.iter().filter(move |b| b.period == period)
    }
}
