use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::date_util::SlashOrder;
use crate::error::{Error, Result};
use crate::ingest::InvalidRowPolicy;
use crate::report::chart::ChartValues;

/// Keys accepted by [`ReportConfig::get`] and [`ReportConfig::set`].
pub const CONFIG_KEYS: &[&str] = &[
    "date_column",
    "department_column",
    "metrics",
    "invalid_rows",
    "sheet",
    "date_order",
    "chart_values",
];

/// Column layout and load policy for inspection spreadsheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub date_column: String,
    pub department_column: String,
    /// Metrics charted as percentage shares, in chart order.
    pub metrics: Vec<String>,
    pub invalid_rows: InvalidRowPolicy,
    /// Worksheet to read; the first sheet when unset.
    pub sheet: Option<String>,
    /// How to read `05/01/2024`. Unset means decide per file from the first
    /// date that only fits one way.
    pub date_order: Option<SlashOrder>,
    pub chart_values: ChartValues,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            date_column: "TANGGAL".into(),
            department_column: "DEPT".into(),
            metrics: vec!["ODOI".into(), "CHECK IN".into()],
            invalid_rows: InvalidRowPolicy::Drop,
            sheet: None,
            date_order: None,
            chart_values: ChartValues::Shares,
        }
    }
}

impl ReportConfig {
    /// Default config location (`~/.odoidash/config.json`).
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".odoidash");
        Ok(dir.join("config.json"))
    }

    /// Load the config at `path`. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "date_column" => Some(self.date_column.clone()),
            "department_column" => Some(self.department_column.clone()),
            "metrics" => Some(self.metrics.join(",")),
            "invalid_rows" => Some(self.invalid_rows.to_string()),
            "sheet" => self.sheet.clone(),
            "date_order" => Some(
                self.date_order
                    .map_or_else(|| "auto".to_string(), |o| o.to_string()),
            ),
            "chart_values" => Some(self.chart_values.to_string()),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    /// Set a key from its text form. `metrics` takes a comma-separated list;
    /// an empty `sheet` clears it and `date_order` accepts `auto`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "date_column" => self.date_column = non_empty(key, value)?,
            "department_column" => self.department_column = non_empty(key, value)?,
            "metrics" => {
                let metrics: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect();
                if metrics.is_empty() {
                    return Err(Error::Config("metrics must name at least one column".into()));
                }
                self.metrics = metrics;
            }
            "invalid_rows" => self.invalid_rows = value.parse()?,
            "sheet" => {
                self.sheet = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "date_order" => {
                self.date_order = match value.to_lowercase().as_str() {
                    "" | "auto" => None,
                    _ => Some(value.parse()?),
                };
            }
            "chart_values" => self.chart_values = value.parse()?,
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }

    /// All keys with their current values; unset keys are omitted.
    pub fn entries(&self) -> Vec<(String, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|k| {
                self.get(k)
                    .ok()
                    .flatten()
                    .map(|v| (k.to_string(), v))
            })
            .collect()
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        Err(Error::Config(format!("{key} cannot be empty")))
    } else {
        Ok(value.to_string())
    }
}

fn unknown_key(key: &str) -> Error {
    Error::Config(format!(
        "unknown config key '{key}' (expected one of: {})",
        CONFIG_KEYS.join(", ")
    ))
}
