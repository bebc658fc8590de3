//! Session configuration file
//!
//! `brakescope.json` next to the source files (or `--config <file>`) sets the
//! ingestion column and the initial chart state. Every key is optional:
//!
//! ```json
//! {
//!   "description_column": "Description",
//!   "extensions": ["csv"],
//!   "chart": "bar",
//!   "sort_key": "frequency",
//!   "sort_ascending": false,
//!   "show_percentage": true,
//!   "axes_swapped": false
//! }
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analytics::{ChartKind, SelectionState};
use crate::error::{AnalyticsError, Result};
use crate::model::SortKey;

pub const DEFAULT_CONFIG_FILE: &str = "brakescope.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub description_column: String,
    pub extensions: Vec<String>,
    pub chart: ChartKind,
    pub sort_key: SortKey,
    pub sort_ascending: bool,
    pub show_percentage: bool,
    pub axes_swapped: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            description_column: "Description".to_string(),
            extensions: vec!["csv".to_string()],
            chart: ChartKind::Bar,
            sort_key: SortKey::Description,
            sort_ascending: true,
            show_percentage: true,
            axes_swapped: false,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Use `explicit` if given, else `brakescope.json` in the data folder, else defaults.
    pub fn discover(explicit: Option<&Path>, data_path: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let dir: PathBuf = if data_path.is_dir() {
            data_path.to_path_buf()
        } else {
            data_path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        let candidate = dir.join(DEFAULT_CONFIG_FILE);

        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using config file");
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.description_column.trim().is_empty() {
            return Err(AnalyticsError::Config("description_column must not be empty".to_string()));
        }
        if self.extensions.is_empty() {
            return Err(AnalyticsError::Config("extensions must list at least one".to_string()));
        }
        Ok(())
    }

    /// Initial selection state for a new session.
    pub fn initial_selection(&self) -> SelectionState {
        SelectionState {
            chart_kind: self.chart,
            sort_key: self.sort_key,
            sort_ascending: self.sort_ascending,
            show_percentage: self.show_percentage,
            axes_swapped: self.axes_swapped,
            ..SelectionState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_json(r#"{"chart": "treemap", "sort_key": "frequency", "sort_ascending": false}"#).unwrap();
        assert_eq!(config.chart, ChartKind::Treemap);
        assert_eq!(config.sort_key, SortKey::Frequency);
        assert!(!config.sort_ascending);
        assert_eq!(config.description_column, "Description");

        let state = config.initial_selection();
        assert_eq!(state.chart_kind, ChartKind::Treemap);
        assert!(state.show_percentage);
        assert!(state.selected_errors.is_empty());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(matches!(Config::from_json(r#"{"colour": "red"}"#), Err(AnalyticsError::Json(_))));
    }

    #[test]
    fn test_blank_column_rejected() {
        assert!(matches!(
            Config::from_json(r#"{"description_column": "  "}"#),
            Err(AnalyticsError::Config(_))
        ));
        assert!(matches!(Config::from_json(r#"{"extensions": []}"#), Err(AnalyticsError::Config(_))));
    }

    #[test]
    fn test_discover_reads_folder_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), r#"{"chart": "pie"}"#).unwrap();

        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.chart, ChartKind::Pie);

        let empty = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(None, empty.path()).unwrap(), Config::default());
    }
}
