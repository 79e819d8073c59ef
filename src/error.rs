use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The upload could not be read as a spreadsheet of inspection records.
    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Filtering left nothing to chart.
    #[error("No records to report: {0}")]
    EmptyResult(String),

    #[error("Invalid period format: {0}")]
    PeriodParse(String),

    #[error("Invalid date: {0}")]
    DateParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<calamine::Error> for Error {
    fn from(e: calamine::Error) -> Self {
        Error::DataFormat(e.to_string())
    }
}

/// File system failures keep their `io::Error`; everything else the reader
/// reports is a malformed upload.
impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        if !e.is_io_error() {
            return Error::DataFormat(e.to_string());
        }
        match e.into_kind() {
            csv::ErrorKind::Io(io) => Error::Io(io),
            other => Error::DataFormat(format!("{other:?}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
