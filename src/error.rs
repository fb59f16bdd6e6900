// 🚨 Error Types - one enum for the whole pipeline
// Structural errors abort a computation; malformed rows are quarantined by the loader.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the ARR pipeline.
#[derive(Error, Debug)]
pub enum ArrError {
    /// A month range whose end precedes its start.
    #[error("Invalid range: end {end} precedes start {start}")]
    InvalidRange { start: String, end: String },

    /// A period string that is not `YYYY-MM`.
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// A record references a customer id absent from the customer table.
    #[error("{table} record {record} references unknown customer {customer_id}")]
    MissingReference {
        table: &'static str,
        record: String,
        customer_id: String,
    },

    /// A row whose date or amount could not be parsed.
    #[error("Malformed {table} record at line {line}: {reason}")]
    MalformedRecord {
        table: &'static str,
        line: usize,
        reason: String,
    },

    /// One of the required input files is absent.
    #[error("Data file not found: {0}")]
    MissingDataFile(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArrError {
    /// True for errors caused by the caller's request rather than the data.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ArrError::InvalidRange { .. } | ArrError::InvalidPeriod(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArrError>;
