pub mod chart;
pub mod period;
pub mod types;

pub use types::*;

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::ingest::Dataset;
use period::{Granularity, PeriodKey};

/// Bucket records by period and department, sum their numeric columns and
/// compute each requested metric's share of its period total.
///
/// Pure: the same dataset and request always give the same report.
pub fn aggregate(dataset: &Dataset, request: &ReportRequest) -> Result<Report> {
    let metrics = resolve_metrics(dataset, &request.metrics)?;

    let filter = match (request.granularity, request.date) {
        (Granularity::Daily, Some(d)) => Some(d),
        (g, Some(d)) => {
            log::debug!("Ignoring date filter {d} for {g} report");
            None
        }
        (_, None) => None,
    };

    let records: Vec<_> = dataset
        .records
        .iter()
        .filter(|r| filter.map_or(true, |d| r.date == d))
        .collect();
    if records.is_empty() {
        return Err(Error::EmptyResult(match filter {
            Some(d) => format!("no records dated {d}"),
            None => "the dataset has no records".into(),
        }));
    }

    let mut groups: BTreeMap<(PeriodKey, String), BTreeMap<String, f64>> = BTreeMap::new();
    for record in &records {
        let key = PeriodKey::of(record.date, request.granularity);
        let totals = groups
            .entry((key, record.department.clone()))
            .or_insert_with(|| {
                dataset
                    .metric_columns
                    .iter()
                    .map(|c| (c.clone(), 0.0))
                    .collect()
            });
        for (column, value) in &record.values {
            *totals.entry(column.clone()).or_insert(0.0) += value;
        }
    }

    let mut period_totals: BTreeMap<PeriodKey, BTreeMap<&str, f64>> = BTreeMap::new();
    for ((period, _), totals) in &groups {
        let sums = period_totals.entry(*period).or_default();
        for metric in &metrics {
            *sums.entry(metric.as_str()).or_insert(0.0) +=
                totals.get(metric).copied().unwrap_or(0.0);
        }
    }

    // Weeks are numbered in the order they occur, continuing across years.
    let labels: BTreeMap<PeriodKey, String> = period_totals
        .keys()
        .enumerate()
        .map(|(i, period)| {
            let label = match period {
                PeriodKey::Week { .. } => format!("Week {}", i + 1),
                _ => period.label(),
            };
            (*period, label)
        })
        .collect();

    let buckets: Vec<AggregatedBucket> = groups
        .iter()
        .map(|((period, department), totals)| {
            let shares = metrics
                .iter()
                .map(|metric| {
                    let value = totals.get(metric).copied().unwrap_or(0.0);
                    let period_total = period_totals
                        .get(period)
                        .and_then(|sums| sums.get(metric.as_str()))
                        .copied()
                        .unwrap_or(0.0);
                    (metric.clone(), percent_share(value, period_total))
                })
                .collect();
            AggregatedBucket {
                period: *period,
                period_label: labels.get(period).cloned().unwrap_or_else(|| period.label()),
                department: department.clone(),
                totals: totals.clone(),
                shares,
            }
        })
        .collect();

    log::debug!(
        "{} report: {} records in {} buckets over {} periods",
        request.granularity,
        records.len(),
        buckets.len(),
        period_totals.len()
    );

    Ok(Report {
        granularity: request.granularity,
        date: filter,
        metrics,
        buckets,
    })
}

/// `value` as a percentage of `total`; undefined when the total is zero.
pub fn percent_share(value: f64, total: f64) -> Option<f64> {
    if total == 0.0 || !total.is_finite() {
        None
    } else {
        Some(value / total * 100.0)
    }
}

/// Map requested metric names onto numeric dataset columns.
fn resolve_metrics(dataset: &Dataset, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Err(Error::MissingColumn("no metric columns requested".into()));
    }
    requested
        .iter()
        .map(|name| {
            let column = dataset
                .resolve_column(name)
                .ok_or_else(|| Error::MissingColumn(name.clone()))?;
            if !dataset.is_numeric(column) {
                return Err(Error::DataFormat(format!("column '{column}' is not numeric")));
            }
            Ok(column.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Record;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(row: usize, on: NaiveDate, dept: &str, odoi: f64, check_in: f64) -> Record {
        Record {
            row,
            date: on,
            department: dept.to_string(),
            values: [("ODOI".to_string(), odoi), ("CHECK IN".to_string(), check_in)]
                .into_iter()
                .collect(),
        }
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("share should be defined");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_daily_two_departments() {
        let ds = Dataset::from_records(vec![
            record(2, date(2024, 1, 1), "A", 10.0, 5.0),
            record(3, date(2024, 1, 1), "B", 30.0, 15.0),
        ]);
        let report = aggregate(&ds, &ReportRequest::new(Granularity::Daily)).unwrap();

        assert_eq!(report.buckets.len(), 2);
        let a = &report.buckets[0];
        let b = &report.buckets[1];
        assert_eq!(a.period, PeriodKey::Day(date(2024, 1, 1)));
        assert_eq!(a.department, "A");
        assert_eq!(b.department, "B");
        assert_close(a.share("ODOI"), 25.0);
        assert_close(b.share("ODOI"), 75.0);
        assert_close(a.share("CHECK IN"), 25.0);
        assert_eq!(a.total("ODOI"), 10.0);
    }

    #[test]
    fn test_shares_sum_to_one_hundred_per_period() {
        let ds = Dataset::from_records(vec![
            record(2, date(2024, 1, 1), "A", 3.0, 1.0),
            record(3, date(2024, 1, 2), "B", 7.0, 2.0),
            record(4, date(2024, 1, 9), "C", 11.0, 0.0),
            record(5, date(2024, 1, 10), "A", 13.0, 9.0),
            record(6, date(2024, 1, 10), "B", 1.0, 4.0),
            record(7, date(2024, 1, 3), "C", 2.0, 6.0),
        ]);
        for granularity in [Granularity::Daily, Granularity::Weekly, Granularity::Monthly] {
            let report = aggregate(&ds, &ReportRequest::new(granularity)).unwrap();
            for period in report.periods() {
                for metric in &report.metrics {
                    let total: f64 = report
                        .period_buckets(period)
                        .map(|b| b.total(metric))
                        .sum();
                    if total == 0.0 {
                        continue;
                    }
                    let sum: f64 = report
                        .period_buckets(period)
                        .filter_map(|b| b.share(metric))
                        .sum();
                    assert!((sum - 100.0).abs() < 1e-9, "{granularity} {period} {metric}: {sum}");
                }
            }
        }
    }

    #[test]
    fn test_zero_period_total_has_no_share() {
        let ds = Dataset::from_records(vec![
            record(2, date(2024, 1, 1), "A", 0.0, 4.0),
            record(3, date(2024, 1, 1), "B", 0.0, 4.0),
        ]);
        let report = aggregate(&ds, &ReportRequest::new(Granularity::Daily)).unwrap();
        assert!(report.buckets.iter().all(|b| b.share("ODOI").is_none()));
        assert_close(report.buckets[0].share("CHECK IN"), 50.0);
    }

    #[test]
    fn test_groups_sum_within_bucket() {
        let ds = Dataset::from_records(vec![
            record(2, date(2024, 1, 1), "A", 1.0, 1.0),
            record(3, date(2024, 1, 1), "A", 2.0, 1.0),
            record(4, date(2024, 1, 1), "B", 1.0, 2.0),
        ]);
        let report = aggregate(&ds, &ReportRequest::new(Granularity::Daily)).unwrap();
        assert_eq!(report.buckets.len(), 2);
        assert_eq!(report.buckets[0].total("ODOI"), 3.0);
        assert_close(report.buckets[0].share("ODOI"), 75.0);
        assert_close(report.buckets[1].share("CHECK IN"), 50.0);
    }

    #[test]
    fn test_daily_filter_keeps_only_that_date() {
        let ds = Dataset::from_records(vec![
            record(2, date(2024, 1, 1), "A", 1.0, 1.0),
            record(3, date(2024, 1, 2), "A", 2.0, 1.0),
            record(4, date(2024, 1, 2), "B", 2.0, 1.0),
            record(5, date(2024, 1, 3), "B", 2.0, 1.0),
        ]);
        let request = ReportRequest::new(Granularity::Daily).date(date(2024, 1, 2));
        let report = aggregate(&ds, &request).unwrap();
        assert_eq!(report.date, Some(date(2024, 1, 2)));
        assert_eq!(report.buckets.len(), 2);
        assert!(report
            .buckets
            .iter()
            .all(|b| b.period == PeriodKey::Day(date(2024, 1, 2))));
    }

    #[test]
    fn test_daily_filter_without_matches_is_empty_result() {
        let ds = Dataset::from_records(vec![record(2, date(2024, 1, 1), "A", 1.0, 1.0)]);
        let request = ReportRequest::new(Granularity::Daily).date(date(2024, 2, 1));
        assert!(matches!(
            aggregate(&ds, &request),
            Err(Error::EmptyResult(_))
        ));
    }

    #[test]
    fn test_date_filter_ignored_for_monthly() {
        let ds = Dataset::from_records(vec![
            record(2, date(2024, 1, 1), "A", 1.0, 1.0),
            record(3, date(2024, 1, 2), "A", 2.0, 1.0),
        ]);
        let request = ReportRequest::new(Granularity::Monthly).date(date(2024, 1, 2));
        let report = aggregate(&ds, &request).unwrap();
        assert_eq!(report.date, None);
        assert_eq!(report.buckets[0].total("ODOI"), 3.0);
    }

    #[test]
    fn test_missing_metric_column() {
        let mut ds = Dataset::from_records(vec![record(2, date(2024, 1, 1), "A", 1.0, 1.0)]);
        for r in &mut ds.records {
            r.values.remove("ODOI");
        }
        ds.columns.retain(|c| c != "ODOI");
        ds.metric_columns.retain(|c| c != "ODOI");

        match aggregate(&ds, &ReportRequest::new(Granularity::Daily)) {
            Err(Error::MissingColumn(name)) => assert_eq!(name, "ODOI"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_metric_column() {
        let mut ds = Dataset::from_records(vec![record(2, date(2024, 1, 1), "A", 1.0, 1.0)]);
        ds.metric_columns.retain(|c| c != "CHECK IN");
        assert!(matches!(
            aggregate(&ds, &ReportRequest::new(Granularity::Daily)),
            Err(Error::DataFormat(_))
        ));
    }

    #[test]
    fn test_no_metrics_requested() {
        let ds = Dataset::from_records(vec![record(2, date(2024, 1, 1), "A", 1.0, 1.0)]);
        let request = ReportRequest::new(Granularity::Daily).metrics(Vec::<String>::new());
        assert!(matches!(
            aggregate(&ds, &request),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn test_empty_dataset_is_empty_result() {
        let mut ds = Dataset::from_records(vec![record(2, date(2024, 1, 1), "A", 1.0, 1.0)]);
        ds.records.clear();
        assert!(matches!(
            aggregate(&ds, &ReportRequest::new(Granularity::Weekly)),
            Err(Error::EmptyResult(_))
        ));
    }

    #[test]
    fn test_monthly_keeps_years_apart() {
        let ds = Dataset::from_records(vec![
            record(2, date(2023, 1, 15), "A", 1.0, 1.0),
            record(3, date(2024, 1, 15), "A", 4.0, 1.0),
            record(4, date(2023, 10, 1), "A", 2.0, 1.0),
        ]);
        let report = aggregate(&ds, &ReportRequest::new(Granularity::Monthly)).unwrap();
        let labels: Vec<&str> = report.buckets.iter().map(|b| b.period_label.as_str()).collect();
        assert_eq!(labels, vec!["January 2023", "October 2023", "January 2024"]);
        assert_eq!(report.buckets[2].total("ODOI"), 4.0);
    }

    #[test]
    fn test_weekly_ordinals_continue_across_years() {
        let ds = Dataset::from_records(vec![
            record(2, date(2025, 1, 8), "A", 1.0, 1.0),  // 2025-W02
            record(3, date(2024, 12, 23), "A", 1.0, 1.0), // 2024-W52
            record(4, date(2024, 12, 31), "B", 1.0, 1.0), // 2025-W01
            record(5, date(2025, 1, 2), "A", 1.0, 1.0),  // 2025-W01
        ]);
        let report = aggregate(&ds, &ReportRequest::new(Granularity::Weekly)).unwrap();
        let rows: Vec<(String, &str, &str)> = report
            .buckets
            .iter()
            .map(|b| (b.period.to_key(), b.period_label.as_str(), b.department.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("2024-W52".to_string(), "Week 1", "A"),
                ("2025-W01".to_string(), "Week 2", "A"),
                ("2025-W01".to_string(), "Week 2", "B"),
                ("2025-W02".to_string(), "Week 3", "A"),
            ]
        );
    }

    #[test]
    fn test_invalid_dates_never_reach_buckets() {
        let data = "TANGGAL,DEPT,ODOI,CHECK IN\n\
                    2024-01-01,A,1,1\n\
                    bukan tanggal,A,1000,1000\n\
                    2024-01-01,B,3,1\n";
        let ds = crate::ingest::load_bytes(
            data.as_bytes().to_vec(),
            crate::ingest::SourceFormat::Csv,
            &crate::config::ReportConfig::default(),
        )
        .unwrap();
        let report = aggregate(&ds, &ReportRequest::new(Granularity::Monthly)).unwrap();
        let total: f64 = report.buckets.iter().map(|b| b.total("ODOI")).sum();
        assert_eq!(total, 4.0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let ds = Dataset::from_records(vec![
            record(2, date(2024, 1, 1), "B", 3.0, 1.0),
            record(3, date(2024, 1, 8), "A", 7.0, 2.0),
            record(4, date(2024, 1, 1), "A", 5.0, 0.0),
        ]);
        let request = ReportRequest::new(Granularity::Weekly);
        let first = aggregate(&ds, &request).unwrap();
        let second = aggregate(&ds, &request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_metric_names_resolve_loosely() {
        let ds = Dataset::from_records(vec![record(2, date(2024, 1, 1), "A", 1.0, 1.0)]);
        let request = ReportRequest::new(Granularity::Daily).metrics(["odoi", "check  in"]);
        let report = aggregate(&ds, &request).unwrap();
        assert_eq!(report.metrics, vec!["ODOI", "CHECK IN"]);
    }

    #[test]
    fn test_percent_share() {
        assert_eq!(percent_share(1.0, 4.0), Some(25.0));
        assert_eq!(percent_share(0.0, 0.0), None);
        assert_eq!(percent_share(1.0, f64::NAN), None);
    }
}
