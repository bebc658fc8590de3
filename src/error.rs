//! Error types shared by the analytics core, the ingestor and the CLI

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// The frequency table is absent or empty after ingestion
    #[error("no data loaded: the frequency table is empty")]
    NoDataLoaded,

    /// Metrics were requested for an empty working view
    #[error("cannot summarize an empty working view")]
    EmptyInput,

    /// A source file could not be parsed
    #[error("failed to ingest {path}: {reason}")]
    Ingest { path: PathBuf, reason: String },

    /// A source file has no column keying the error description
    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    /// File name does not follow `dd-mm-yyyy_depot_coach.csv`
    #[error("file name '{0}' should follow the pattern date_depot_coach.csv")]
    InvalidSourceName(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let err = AnalyticsError::MissingColumn {
            path: PathBuf::from("/logs/a.csv"),
            column: "Description".to_string(),
        };
        assert_eq!(err.to_string(), "/logs/a.csv has no 'Description' column");

        let err = AnalyticsError::InvalidSourceName("brakes.csv".to_string());
        assert!(err.to_string().contains("date_depot_coach.csv"));
    }

    #[test]
    fn test_io_errors_convert() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(AnalyticsError::Io(_))));
    }
}
