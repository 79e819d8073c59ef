use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Serialize, Serializer};

use crate::date_util::{last_day_of_month, month_name};
use crate::error::{Error, Result};

/// Time resolution of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// Parse a granularity name.
    ///
    /// Accepts `daily`/`day`/`d`, `weekly`/`week`/`w` and
    /// `monthly`/`month`/`m`, case-insensitively.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Self::Daily),
            "weekly" | "week" | "w" => Ok(Self::Weekly),
            "monthly" | "month" | "m" => Ok(Self::Monthly),
            _ => Err(Error::PeriodParse(format!(
                "unrecognized granularity: {s} (expected daily, weekly or monthly)"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The bucket a record falls into for a given granularity.
///
/// Weeks are ISO weeks qualified by ISO year and months are qualified by
/// year, so the derived ordering is chronological and buckets from
/// different years never merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Day(NaiveDate),
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
}

impl PeriodKey {
    pub fn of(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Daily => PeriodKey::Day(date),
            Granularity::Weekly => {
                let iw = date.iso_week();
                PeriodKey::Week {
                    year: iw.year(),
                    week: iw.week(),
                }
            }
            Granularity::Monthly => PeriodKey::Month {
                year: date.year(),
                month: date.month(),
            },
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            PeriodKey::Day(_) => Granularity::Daily,
            PeriodKey::Week { .. } => Granularity::Weekly,
            PeriodKey::Month { .. } => Granularity::Monthly,
        }
    }

    /// Canonical key string: `2025-01-31`, `2025-W05` or `2025-01`.
    pub fn to_key(&self) -> String {
        match self {
            PeriodKey::Day(d) => d.format("%Y-%m-%d").to_string(),
            PeriodKey::Week { year, week } => format!("{year}-W{week:02}"),
            PeriodKey::Month { year, month } => format!("{year}-{month:02}"),
        }
    }

    /// Human-readable axis label. Weekly reports relabel weeks by ordinal.
    pub fn label(&self) -> String {
        match self {
            PeriodKey::Month { year, month } => format!("{} {year}", month_name(*month)),
            _ => self.to_key(),
        }
    }

    /// Inclusive first and last day of the period.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            PeriodKey::Day(d) => Some((*d, *d)),
            PeriodKey::Week { year, week } => {
                let start = NaiveDate::from_isoywd_opt(*year, *week, Weekday::Mon)?;
                Some((start, start + Duration::days(6)))
            }
            PeriodKey::Month { year, month } => Some((
                NaiveDate::from_ymd_opt(*year, *month, 1)?,
                last_day_of_month(*year, *month)?,
            )),
        }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_key())
    }
}
