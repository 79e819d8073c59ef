use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use odoidash::report::chart::{charts, Chart};
use odoidash::{
    ChartValues, Granularity, InvalidRowPolicy, Report, ReportAggregator, ReportConfig,
};

/// Width of the longest bar in text charts.
const BAR_WIDTH: f64 = 40.0;

#[derive(Parser)]
#[command(name = "odoidash", about = "One Day One Inspection report CLI")]
struct Cli {
    /// Config file path (default: ~/.odoidash/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a spreadsheet into per-department period charts
    Report {
        /// Spreadsheet file (xlsx, xls, xlsb, ods or csv)
        file: PathBuf,
        /// Granularity: daily, weekly or monthly
        #[arg(long, default_value = "daily")]
        period: String,
        /// Only this date (YYYY-MM-DD); daily reports only
        #[arg(long)]
        date: Option<String>,
        /// Metric column to chart (repeatable; default from config)
        #[arg(long = "metric", value_name = "COLUMN")]
        metrics: Vec<String>,
        /// Worksheet name (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// Warn about every row dropped for a bad date or missing department
        #[arg(long)]
        report_invalid: bool,
        /// Chart bars as percentage shares or raw counts (default from config)
        #[arg(long, value_name = "shares|counts")]
        values: Option<String>,
        /// Read 05/01/2024 as day-first or month-first (default: detect)
        #[arg(long, value_name = "ORDER")]
        date_order: Option<String>,
        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },
    /// Show the date range covered by a spreadsheet
    Dates {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a spreadsheet's columns and which are numeric
    Columns {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_path = match cli.config {
        Some(path) => path,
        None => ReportConfig::default_path()?,
    };
    let mut config = ReportConfig::load_from(&config_path)?;

    match cli.command {
        Commands::Report {
            file,
            period,
            date,
            metrics,
            sheet,
            report_invalid,
            values,
            date_order,
            json,
            csv,
        } => {
            if sheet.is_some() {
                config.sheet = sheet;
            }
            if !metrics.is_empty() {
                config.metrics = metrics;
            }
            if report_invalid {
                config.invalid_rows = InvalidRowPolicy::Report;
            }
            if let Some(v) = values {
                config.chart_values = v.parse()?;
            }
            if let Some(order) = date_order {
                config.set("date_order", &order)?;
            }
            let granularity = Granularity::parse(&period)?;
            let date = date
                .as_deref()
                .map(|s| {
                    odoidash::date_util::parse_date_text(s)
                        .ok_or_else(|| odoidash::Error::DateParse(s.to_string()))
                })
                .transpose()?;
            handle_report(ReportAggregator::new(config), &file, granularity, date, json, csv)?;
        }
        Commands::Dates { file, sheet, json } => {
            if sheet.is_some() {
                config.sheet = sheet;
            }
            handle_dates(&ReportAggregator::new(config), &file, json)?;
        }
        Commands::Columns { file, sheet } => {
            if sheet.is_some() {
                config.sheet = sheet;
            }
            handle_columns(&ReportAggregator::new(config), &file)?;
        }
        Commands::Config { action } => {
            handle_config(config, &config_path, action)?;
        }
    }

    Ok(())
}

fn handle_report(
    aggregator: ReportAggregator,
    file: &Path,
    granularity: Granularity,
    date: Option<chrono::NaiveDate>,
    json: bool,
    csv: bool,
) -> anyhow::Result<()> {
    let dataset = aggregator.load_path(file)?;

    if let (Some(d), Some(bounds)) = (date, dataset.date_bounds()) {
        if !bounds.contains(d) {
            log::warn!("{d} is outside the data range {} to {}", bounds.min, bounds.max);
        }
    }

    let report = aggregator.report(&dataset, granularity, date)?;
    let values = aggregator.config().chart_values;

    if json {
        println!("{}", odoidash::export::to_json(&report, values)?);
    } else if csv {
        print!("{}", odoidash::export::to_csv(&report)?);
    } else {
        println!("{} Report ({} records)", report.granularity, dataset.len());
        if !dataset.skipped.is_empty() {
            println!("  {} rows skipped", dataset.skipped.len());
        }
        for chart in charts(&report, values) {
            println!();
            print_chart(&report, &chart);
        }
    }
    Ok(())
}

fn print_chart(report: &Report, chart: &Chart) {
    println!("{}", chart.title);
    let label = |p: &odoidash::ChartPoint| {
        if chart.facet_by_department {
            format!("{} / {}", p.department, p.series)
        } else {
            p.series.clone()
        }
    };
    let width = chart
        .points
        .iter()
        .map(|p| label(p).chars().count())
        .max()
        .unwrap_or(0);
    let full_scale = match chart.values {
        ChartValues::Shares => 100.0,
        ChartValues::Counts => chart
            .points
            .iter()
            .filter_map(|p| p.value)
            .fold(0.0, f64::max),
    };

    for period in report.periods() {
        let key = period.to_key();
        let mut points = chart.points.iter().filter(|p| p.period_key == key).peekable();
        let Some(first) = points.peek() else {
            continue;
        };
        match period.date_range() {
            Some((start, end)) if period.granularity() != Granularity::Daily => {
                println!("  {} ({start} to {end})", first.period_label);
            }
            _ => println!("  {}", first.period_label),
        }
        for p in points {
            let bar_len = match p.value {
                Some(v) if full_scale > 0.0 => {
                    (v.clamp(0.0, full_scale) / full_scale * BAR_WIDTH).round() as usize
                }
                _ => 0,
            };
            println!(
                "    {:<width$} {} {}",
                label(p),
                "█".repeat(bar_len),
                p.text,
                width = width
            );
        }
    }
}

fn handle_dates(aggregator: &ReportAggregator, file: &Path, json: bool) -> anyhow::Result<()> {
    let dataset = aggregator.load_path(file)?;
    let bounds = dataset.date_bounds();

    if json {
        let out = serde_json::json!({
            "records": dataset.len(),
            "skipped": dataset.skipped,
            "bounds": bounds,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Records: {}", dataset.len());
    println!("Skipped: {}", dataset.skipped.len());
    match bounds {
        Some(b) => {
            println!("First:   {}", b.min);
            println!("Last:    {}", b.max);
        }
        None => println!("No dated records."),
    }
    Ok(())
}

fn handle_columns(aggregator: &ReportAggregator, file: &Path) -> anyhow::Result<()> {
    let dataset = aggregator.load_path(file)?;
    let config = aggregator.config();
    for column in &dataset.columns {
        let role = if dataset.resolve_column(&config.date_column) == Some(column.as_str()) {
            "date"
        } else if dataset.resolve_column(&config.department_column) == Some(column.as_str()) {
            "department"
        } else if dataset.is_numeric(column) {
            "numeric"
        } else {
            "text"
        };
        println!("{column:<24} {role}");
    }
    Ok(())
}

fn handle_config(
    mut config: ReportConfig,
    path: &Path,
    action: ConfigAction,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match config.get(&key)? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save_to(path)?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            for (k, v) in config.entries() {
                println!("{k} = {v}");
            }
        }
    }
    Ok(())
}
