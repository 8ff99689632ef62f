use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while turning a file into a [`Dataset`].
///
/// [`Dataset`]: super::model::Dataset
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to open '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("CSV row {row}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("Row {row}: expected at least {expected} columns, found {found}")]
    MissingColumn {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row}: '{value}' is not a valid timestamp")]
    BadTimestamp { row: usize, value: String },

    #[error("Row {row}, column '{column}': '{value}' is not a number")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Parquet file is missing the '{0}' column")]
    MissingField(&'static str),

    #[error("Column '{column}' has unsupported type {data_type}")]
    UnsupportedType { column: &'static str, data_type: String },

    #[error("Parsing JSON records")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Unsupported file extension: .{0}")]
    UnsupportedExtension(String),
}

pub type DataResult<T> = Result<T, DataError>;
