use serde::Serialize;

use crate::error::{Error, Result};
use crate::report::chart::{charts, Chart, ChartValues};
use crate::report::Report;

/// A report together with its charts, as written by `--json`.
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub report: &'a Report,
    pub charts: Vec<Chart>,
}

pub fn to_json(report: &Report, values: ChartValues) -> Result<String> {
    let doc = ReportDocument {
        report,
        charts: charts(report, values),
    };
    serde_json::to_string_pretty(&doc).map_err(|e| Error::Export(e.to_string()))
}

/// One row per bucket: period, department, then value and share per metric.
pub fn to_csv(report: &Report) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "period_key".to_string(),
        "period_label".to_string(),
        "department".to_string(),
    ];
    for metric in &report.metrics {
        header.push(metric.clone());
        header.push(format!("{metric} %"));
    }
    writer.write_record(&header).map_err(export_error)?;

    for bucket in &report.buckets {
        let mut row = vec![
            bucket.period.to_key(),
            bucket.period_label.clone(),
            bucket.department.clone(),
        ];
        for metric in &report.metrics {
            row.push(bucket.total(metric).to_string());
            row.push(
                bucket
                    .share(metric)
                    .map_or(String::new(), |s| format!("{s:.2}")),
            );
        }
        writer.write_record(&row).map_err(export_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}

fn export_error(e: csv::Error) -> Error {
    Error::Export(e.to_string())
}
