use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// `05/01/2024`, optionally followed by a time.
static RE_SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/\d{4}(?:\s|$)").unwrap());

/// Text layouts accepted for date-only cells, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
];

/// Text layouts accepted for cells that carry a time component.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Field order of all-numeric slash dates such as `05/01/2024`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlashOrder {
    /// `MM/DD/YYYY`
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY`
    DayFirst,
}

impl SlashOrder {
    fn date_format(self) -> &'static str {
        match self {
            Self::MonthFirst => "%m/%d/%Y",
            Self::DayFirst => "%d/%m/%Y",
        }
    }

    fn datetime_formats(self) -> [&'static str; 2] {
        match self {
            Self::MonthFirst => ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"],
            Self::DayFirst => ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"],
        }
    }
}

impl std::str::FromStr for SlashOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "month-first" | "mdy" => Ok(Self::MonthFirst),
            "day-first" | "dmy" => Ok(Self::DayFirst),
            other => Err(Error::Config(format!(
                "date order must be 'day-first' or 'month-first', got '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for SlashOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonthFirst => write!(f, "month-first"),
            Self::DayFirst => write!(f, "day-first"),
        }
    }
}

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (y, m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt()
}

/// English month name for a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}

/// Convert an Excel serial day number to a calendar date.
///
/// Uses the 1899-12-30 epoch, so serials before March 1900 are off by one
/// day (Excel's phantom 1900-02-29). Fractional parts (time of day) are
/// discarded.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Parse a date written as text, reading slash dates month first.
/// Returns `None` when no known layout matches.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    parse_date_text_in(s, SlashOrder::MonthFirst)
}

/// Parse a date written as text, reading slash dates in `order`.
pub fn parse_date_text_in(s: &str, order: SlashOrder) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS.iter().copied().chain([order.date_format()]) {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS.iter().copied().chain(order.datetime_formats()) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Decide the slash order of a column from its first unambiguous value:
/// `15/01/2024` is day first, `01/15/2024` month first. `None` when every
/// slash date fits both readings.
pub fn detect_slash_order<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<SlashOrder> {
    values.into_iter().find_map(|s| {
        let caps = RE_SLASH_DATE.captures(s.trim())?;
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        match (first > 12, second > 12) {
            (true, false) => Some(SlashOrder::DayFirst),
            (false, true) => Some(SlashOrder::MonthFirst),
            _ => None,
        }
    })
}

/// Canonical form of a header cell: trimmed, inner whitespace collapsed,
/// upper-cased.
pub fn normalize_header(s: &str) -> String {
    RE_WHITESPACE.replace_all(s.trim(), " ").to_uppercase()
}
