pub mod config;
pub mod date_util;
pub mod error;
pub mod export;
pub mod ingest;
pub mod report;

pub use config::ReportConfig;
pub use date_util::SlashOrder;
pub use error::{Error, Result};
pub use ingest::{
    DateBounds, Dataset, InvalidRowPolicy, Record, SkipReason, SkippedRow, SourceFormat,
};
pub use report::chart::{Chart, ChartPoint, ChartValues};
pub use report::period::{Granularity, PeriodKey};
pub use report::{AggregatedBucket, Report, ReportRequest};

use std::path::Path;

use chrono::NaiveDate;

/// Main entry point: loads inspection spreadsheets and builds reports using
/// one column layout.
pub struct ReportAggregator {
    config: ReportConfig,
}

impl ReportAggregator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    // ── Load & Clean ───────────────────────────────────────────────

    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        ingest::load_path(path, &self.config)
    }

    pub fn load_bytes(&self, bytes: Vec<u8>, format: SourceFormat) -> Result<Dataset> {
        ingest::load_bytes(bytes, format, &self.config)
    }

    // ── Aggregate & Shape ──────────────────────────────────────────

    /// A request for the configured metrics.
    pub fn request(&self, granularity: Granularity, date: Option<NaiveDate>) -> ReportRequest {
        let request = ReportRequest::new(granularity).metrics(self.config.metrics.clone());
        match date {
            Some(d) => request.date(d),
            None => request,
        }
    }

    pub fn report(
        &self,
        dataset: &Dataset,
        granularity: Granularity,
        date: Option<NaiveDate>,
    ) -> Result<Report> {
        report::aggregate(dataset, &self.request(granularity, date))
    }
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}
