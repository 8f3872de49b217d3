//! Error taxonomy for loading and analysing benchmark tables

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or analysing experiment records
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Input file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Missing required column '{column}' in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Malformed record in {} at row {row}: column '{column}' has invalid value '{value}'", path.display())]
    MalformedRecord {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("No usable rows in {}: {reason}", path.display())]
    EmptyInput { path: PathBuf, reason: String },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
