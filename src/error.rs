use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while a job
/// loads, reconciles, or saves workbooks. Every variant is fatal for the run.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when a JSON configuration file cannot be parsed or printed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the workbook exists but lacks the requested worksheet.
    #[error(
        "worksheet '{sheet}' not found in '{path}' (sheet names are case-sensitive); \
         available sheets: {available:?}"
    )]
    MissingSheet {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },

    /// Raised when a worksheet has no header row to read columns from.
    #[error("worksheet '{sheet}' in '{path}' is empty or has no header row")]
    EmptySheet { path: PathBuf, sheet: String },

    /// Raised when required columns are absent. Lists every missing column and
    /// every column that was found so the configuration can be corrected.
    #[error(
        "missing columns in '{source_name}' ({path}): {missing:?}; available columns: {available:?}"
    )]
    MissingColumns {
        source_name: String,
        path: PathBuf,
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the output workbook cannot be written.
    #[error(
        "failed to save '{path}': {source}; close the file if it is open in another program \
         and check write permissions"
    )]
    SaveWorkbook {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// Raised when a configuration file is rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
