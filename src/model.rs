//! Source tables handed over by the log ingestor
//!
//! Two tables describe one load:
//!
//! - [`FrequencyTable`]: one [`ErrorFrequencyRecord`] per distinct error kind,
//!   keyed by `description`, carrying a precomputed count.
//! - [`DetailTable`]: the raw log rows ([`ErrorDetailRecord`]) with whatever
//!   columns the ingested files had. Many detail rows share a description.
//!
//! Both are replaced wholesale on every load; the session never edits them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::AnalyticsError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorFrequencyRecord {
    pub description: String,
    pub frequency: u64,
}

impl ErrorFrequencyRecord {
    pub fn new(description: impl Into<String>, frequency: u64) -> Self {
        Self { description: description.into(), frequency }
    }
}

/// A raw log row. `fields` maps column name to the cell as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetailRecord {
    pub description: String,
    pub fields: HashMap<String, String>,
}

impl ErrorDetailRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Error kinds and their counts, unique by description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrequencyTable {
    records: Vec<ErrorFrequencyRecord>,
}

impl FrequencyTable {
    /// Build a table, merging duplicate descriptions by summing their counts
    /// (saturating at `u64::MAX`). First-seen order is kept.
    pub fn new(records: impl IntoIterator<Item = ErrorFrequencyRecord>) -> Self {
        let mut merged: Vec<ErrorFrequencyRecord> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in records {
            match index.get(&record.description) {
                Some(&i) => {
                    let total = &mut merged[i].frequency;
                    *total = total.saturating_add(record.frequency);
                }
                None => {
                    index.insert(record.description.clone(), merged.len());
                    merged.push(record);
                }
            }
        }

        Self { records: merged }
    }

    pub fn records(&self) -> &[ErrorFrequencyRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorFrequencyRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, description: &str) -> bool {
        self.records.iter().any(|r| r.description == description)
    }

    pub fn descriptions(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.description.as_str()).collect()
    }
}

/// Raw log rows plus the column set derived at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailTable {
    columns: Vec<String>,
    records: Vec<ErrorDetailRecord>,
}

impl DetailTable {
    pub fn new(columns: Vec<String>, records: Vec<ErrorDetailRecord>) -> Self {
        Self { columns, records }
    }

    /// Column names in source order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn records(&self) -> &[ErrorDetailRecord] {
        &self.records
    }

    pub fn records_for<'a>(
        &'a self,
        description: &'a str,
    ) -> impl Iterator<Item = &'a ErrorDetailRecord> + 'a {
        self.records.iter().filter(move |r| r.description == description)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Depot, coach and recording date encoded in a source file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMetadata {
    pub date: NaiveDate,
    pub depot: String,
    pub coach: String,
}

impl SourceMetadata {
    /// Parse `dd-mm-yyyy_<depot>_<coach>.csv`. The depot may itself contain
    /// underscores; the coach is whatever follows the last one.
    pub fn from_file_name(name: &str) -> Result<Self, AnalyticsError> {
        let invalid = || AnalyticsError::InvalidSourceName(name.to_string());

        let stem = name
            .strip_suffix(".csv")
            .or_else(|| name.strip_suffix(".CSV"))
            .ok_or_else(invalid)?;
        let (date, rest) = stem.split_once('_').ok_or_else(invalid)?;
        let (depot, coach) = rest.rsplit_once('_').ok_or_else(invalid)?;

        if date.len() != 10 || depot.is_empty() || coach.is_empty() {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(date, "%d-%m-%Y").map_err(|_| invalid())?;

        Ok(Self { date, depot: depot.to_string(), coach: coach.to_string() })
    }
}

/// One ingested source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub name: String,
    pub rows: usize,
    pub metadata: Option<SourceMetadata>,
    /// Set when the file could not be read and was left out of the load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything one load hands to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceTables {
    pub frequencies: FrequencyTable,
    pub details: DetailTable,
    pub sources: Vec<SourceFile>,
}

impl SourceTables {
    /// Tables with no detail rows, e.g. a frequency summary loaded on its own.
    pub fn from_frequencies(records: impl IntoIterator<Item = ErrorFrequencyRecord>) -> Self {
        Self { frequencies: FrequencyTable::new(records), ..Default::default() }
    }
}

/// Column the working view is ordered by.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Description,
    Frequency,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Description => write!(f, "Description"),
            SortKey::Frequency => write!(f, "Frequency"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // FREQUENCY TABLE TESTS
    // ==========================================================================

    #[test]
    fn test_duplicate_descriptions_merge() {
        let table = FrequencyTable::new(vec![
            ErrorFrequencyRecord::new("I_BP_LOW", 3),
            ErrorFrequencyRecord::new("POWER_ON", 1),
            ErrorFrequencyRecord::new("I_BP_LOW", 4),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0], ErrorFrequencyRecord::new("I_BP_LOW", 7));
        assert_eq!(table.records()[1], ErrorFrequencyRecord::new("POWER_ON", 1));
    }

    #[test]
    fn test_merge_saturates_instead_of_overflowing() {
        let table = FrequencyTable::new(vec![
            ErrorFrequencyRecord::new("A", u64::MAX),
            ErrorFrequencyRecord::new("A", 1),
            ErrorFrequencyRecord::new("B", 2),
        ]);

        assert_eq!(table.records()[0], ErrorFrequencyRecord::new("A", u64::MAX));
        assert_eq!(table.records()[1], ErrorFrequencyRecord::new("B", 2));
    }

    #[test]
    fn test_contains_is_exact() {
        let table = FrequencyTable::new(vec![ErrorFrequencyRecord::new("BrakeFail", 10)]);
        assert!(table.contains("BrakeFail"));
        assert!(!table.contains("brakefail"));
        assert!(!table.contains("Brake"));
    }

    // ==========================================================================
    // DETAIL TABLE TESTS
    // ==========================================================================

    #[test]
    fn test_records_for_description() {
        let row = |desc: &str, nr: &str| ErrorDetailRecord {
            description: desc.to_string(),
            fields: HashMap::from([
                ("Nr".to_string(), nr.to_string()),
                ("Description".to_string(), desc.to_string()),
            ]),
        };
        let table = DetailTable::new(
            vec!["Nr".to_string(), "Description".to_string()],
            vec![row("COMM_ERROR", "0001"), row("POWER_ON", "0002"), row("COMM_ERROR", "0003")],
        );

        let nrs: Vec<_> = table.records_for("COMM_ERROR").filter_map(|r| r.get("Nr")).collect();
        assert_eq!(nrs, vec!["0001", "0003"]);
        assert!(table.has_column("Nr"));
        assert!(!table.has_column("SPEED"));
    }

    // ==========================================================================
    // SOURCE FILE NAME TESTS
    // ==========================================================================

    #[test]
    fn test_source_name_parses() {
        let meta = SourceMetadata::from_file_name("14-03-2024_Pune_C1234.csv").unwrap();
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
        assert_eq!(meta.depot, "Pune");
        assert_eq!(meta.coach, "C1234");
    }

    #[test]
    fn test_source_file_serializes_date() {
        let source = SourceFile {
            name: "14-03-2024_Pune_C1234.csv".to_string(),
            rows: 3,
            metadata: SourceMetadata::from_file_name("14-03-2024_Pune_C1234.csv").ok(),
            error: None,
        };

        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["metadata"]["date"], "2024-03-14");
        assert_eq!(json["metadata"]["depot"], "Pune");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_source_name_depot_with_underscore() {
        let meta = SourceMetadata::from_file_name("01-12-2023_North_Yard_7A.csv").unwrap();
        assert_eq!(meta.depot, "North_Yard");
        assert_eq!(meta.coach, "7A");
    }

    #[test]
    fn test_source_name_rejects_other_patterns() {
        for name in [
            "brakes.csv",
            "2024-03-14_Pune_C1.csv",
            "14-03-2024_Pune.csv",
            "32-01-2024_Pune_C1.csv",
            "14-03-2024_Pune_C1.txt",
        ] {
            assert!(
                matches!(
                    SourceMetadata::from_file_name(name),
                    Err(AnalyticsError::InvalidSourceName(_))
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_sort_key_serde_names() {
        assert_eq!(serde_json::to_string(&SortKey::Frequency).unwrap(), "\"frequency\"");
        let key: SortKey = serde_json::from_str("\"description\"").unwrap();
        assert_eq!(key, SortKey::Description);
    }
}
