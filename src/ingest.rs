//! Loading source tables
//!
//! The session does not read files itself; a [`LogIngestor`] hands it fully
//! materialized [`SourceTables`]. [`CsvFolderIngestor`] is the stock
//! implementation for brake-log exports:
//!
//! - every `*.csv` under a folder (or a single file) is one export
//! - the first line is the header; one column holds the error description
//! - the frequency summary is the number of rows per description
//! - file names like `14-03-2024_Pune_C1234.csv` carry date, depot and coach

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{AnalyticsError, Result};
use crate::model::{
    DetailTable, ErrorDetailRecord, ErrorFrequencyRecord, FrequencyTable, SourceFile,
    SourceMetadata, SourceTables,
};

/// Produces the tables a session works on.
pub trait LogIngestor {
    fn ingest(&self, path: &Path) -> Result<SourceTables>;
}

#[derive(Debug, Clone)]
pub struct CsvFolderIngestor {
    description_column: String,
    extensions: Vec<String>,
}

struct ParsedFile {
    name: String,
    columns: Vec<String>,
    records: Vec<ErrorDetailRecord>,
}

impl Default for CsvFolderIngestor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CsvFolderIngestor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            description_column: config.description_column.clone(),
            extensions: config.extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    /// Source files under `path`, sorted so loads are reproducible.
    pub fn find_files(&self, path: &Path) -> Vec<PathBuf> {
        if path.is_file() {
            return vec![path.to_path_buf()];
        }

        WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect()
    }

    /// Ingest `files`, calling `on_file` after each one is parsed.
    ///
    /// A file that cannot be read is logged, listed in `sources` with its
    /// error and otherwise skipped. The load only fails when no file could be
    /// read, or when a file lacks the description column.
    pub fn ingest_files<F>(&self, files: &[PathBuf], on_file: F) -> Result<SourceTables>
    where
        F: Fn(&Path) + Sync,
    {
        let results: Vec<(&PathBuf, Result<ParsedFile>)> = files
            .par_iter()
            .map(|path| {
                let file = self.parse_file(path);
                on_file(path);
                (path, file)
            })
            .collect();

        let mut parsed = Vec::with_capacity(results.len());
        let mut unreadable = Vec::new();
        let mut first_error = None;

        for (path, result) in results {
            match result {
                Ok(file) => parsed.push(file),
                Err(err @ AnalyticsError::MissingColumn { .. }) => return Err(err),
                Err(err) => {
                    warn!(file = %path.display(), "skipping unreadable source: {}", err);
                    unreadable.push(SourceFile {
                        name: file_name(path),
                        rows: 0,
                        metadata: None,
                        error: Some(err.to_string()),
                    });
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if parsed.is_empty() {
            if let Some(err) = first_error {
                return Err(err);
            }
        }

        let mut tables = merge(parsed);
        tables.sources.extend(unreadable);
        Ok(tables)
    }

    fn parse_file(&self, path: &Path) -> Result<ParsedFile> {
        let text = std::fs::read_to_string(path).map_err(|e| AnalyticsError::Ingest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = file_name(path);

        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| AnalyticsError::Ingest {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        })?;
        let columns = split_csv_line(header.trim_start_matches('\u{feff}'));

        let key = columns
            .iter()
            .position(|c| *c == self.description_column)
            .ok_or_else(|| AnalyticsError::MissingColumn {
                path: path.to_path_buf(),
                column: self.description_column.clone(),
            })?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            let cells = split_csv_line(line);
            let description = cells.get(key).map(String::as_str).unwrap_or_default();
            if description.is_empty() {
                skipped += 1;
                continue;
            }

            let fields = columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), cells.get(i).cloned().unwrap_or_default()))
                .collect::<HashMap<_, _>>();
            records.push(ErrorDetailRecord { description: description.to_string(), fields });
        }

        if skipped > 0 {
            debug!(file = %name, skipped, "skipped rows without a description");
        }

        Ok(ParsedFile { name, columns, records })
    }
}

impl LogIngestor for CsvFolderIngestor {
    fn ingest(&self, path: &Path) -> Result<SourceTables> {
        let files = self.find_files(path);
        let tables = self.ingest_files(&files, |_| {})?;
        info!(
            files = files.len(),
            errors = tables.frequencies.len(),
            "ingested {}",
            path.display()
        );
        Ok(tables)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn merge(parsed: Vec<ParsedFile>) -> SourceTables {
    let mut columns: Vec<String> = Vec::new();
    let mut records: Vec<ErrorDetailRecord> = Vec::new();
    let mut counts: Vec<ErrorFrequencyRecord> = Vec::new();
    let mut sources = Vec::with_capacity(parsed.len());

    for file in parsed {
        for column in file.columns {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }

        let metadata = match SourceMetadata::from_file_name(&file.name) {
            Ok(meta) => Some(meta),
            Err(err) => {
                warn!("{}", err);
                None
            }
        };
        sources.push(SourceFile {
            name: file.name,
            rows: file.records.len(),
            metadata,
            error: None,
        });

        for record in file.records {
            counts.push(ErrorFrequencyRecord::new(record.description.clone(), 1));
            records.push(record);
        }
    }

    SourceTables {
        // FrequencyTable::new merges the per-row counts
        frequencies: FrequencyTable::new(counts),
        details: DetailTable::new(columns, records),
        sources,
    }
}

/// Split one CSV line. Handles quoted cells with embedded commas and `""`
/// escapes; cells are trimmed.
///
/// Files are split into lines before this runs, so a quoted cell spanning a
/// line break is cut in two: the first line ends inside the open quote and
/// the remainder is read as a record of its own. An unterminated quote runs
/// to the end of the line.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());

    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "Nr,Code,Date,Time,SPEED,Description";

    fn write(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        fs::write(&path, text).unwrap();
        path
    }

    // ==========================================================================
    // CSV LINE TESTS
    // ==========================================================================

    #[test]
    fn test_split_plain() {
        assert_eq!(split_csv_line("0001, A123 ,I_BP_LOW"), vec!["0001", "A123", "I_BP_LOW"]);
    }

    #[test]
    fn test_split_quoted() {
        assert_eq!(
            split_csv_line(r#"1,"BRAKE, REAR","say ""hi""""#),
            vec!["1", "BRAKE, REAR", r#"say "hi""#]
        );
    }

    #[test]
    fn test_split_trailing_empty() {
        assert_eq!(split_csv_line("a,,"), vec!["a", "", ""]);
    }

    #[test]
    fn test_split_unterminated_quote_runs_to_line_end() {
        assert_eq!(split_csv_line(r#"BRAKE,"line one"#), vec!["BRAKE", "line one"]);
    }

    // ==========================================================================
    // FOLDER INGESTION TESTS
    // ==========================================================================

    #[test]
    fn test_counts_rows_per_description() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "14-03-2024_Pune_C1.csv", &[
            "0001,A001,14/03/24,10:00:00,0040,I_BP_LOW",
            "0002,A002,14/03/24,10:00:05,0041,POWER_ON",
            "0003,A001,14/03/24,10:01:00,0000,I_BP_LOW",
        ]);
        write(dir.path(), "15-03-2024_Pune_C1.csv", &["0001,A009,15/03/24,08:00:00,0000,I_BP_LOW"]);

        let tables = CsvFolderIngestor::default().ingest(dir.path()).unwrap();

        assert_eq!(
            tables.frequencies.records(),
            &[ErrorFrequencyRecord::new("I_BP_LOW", 3), ErrorFrequencyRecord::new("POWER_ON", 1)]
        );
        assert_eq!(tables.details.len(), 4);
        assert_eq!(tables.details.columns().len(), 6);
        assert_eq!(tables.sources.len(), 2);
        assert_eq!(tables.sources[0].rows, 3);
        assert_eq!(tables.sources[0].metadata.as_ref().unwrap().depot, "Pune");
    }

    #[test]
    fn test_other_extensions_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.csv", &["1,A,d,t,0,COMM_ERROR"]);
        fs::write(dir.path().join("notes.txt"), "Description\nNOT_AN_ERROR").unwrap();

        let ingestor = CsvFolderIngestor::default();
        assert_eq!(ingestor.find_files(dir.path()).len(), 1);

        let tables = ingestor.ingest(dir.path()).unwrap();
        assert!(!tables.frequencies.contains("NOT_AN_ERROR"));
        assert!(tables.sources[0].metadata.is_none(), "a.csv carries no metadata");
    }

    #[test]
    fn test_blank_descriptions_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.csv", &["1,A,d,t,0,", "2,A,d,t,0,SENSOR_FAIL", ""]);

        let tables = CsvFolderIngestor::default().ingest(&path).unwrap();
        assert_eq!(tables.frequencies.len(), 1);
        assert_eq!(tables.details.len(), 1);
    }

    #[test]
    fn test_missing_description_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "Nr,Code\n1,A").unwrap();

        let err = CsvFolderIngestor::default().ingest(&path).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumn { .. }));
    }

    #[test]
    fn test_custom_description_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "Nr,Fault\n1,OVER_VOLTAGE\n2,OVER_VOLTAGE").unwrap();

        let config = Config { description_column: "Fault".to_string(), ..Config::default() };
        let tables = CsvFolderIngestor::from_config(&config).ingest(&path).unwrap();
        assert_eq!(tables.frequencies.records(), &[ErrorFrequencyRecord::new("OVER_VOLTAGE", 2)]);
    }

    #[test]
    fn test_empty_folder_gives_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        let tables = CsvFolderIngestor::default().ingest(dir.path()).unwrap();
        assert!(tables.frequencies.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "14-03-2024_Pune_C1.csv", &[
            "0001,A001,14/03/24,10:00:00,0040,I_BP_LOW",
            "0002,A001,14/03/24,10:00:09,0038,I_BP_LOW",
        ]);
        let mut latin1 = format!("{}\n0001,A002,15/03/24,08:00:00,0000,CAF", HEADER).into_bytes();
        latin1.extend_from_slice(&[0xE9, b'_', b'E', b'R', b'R']);
        fs::write(dir.path().join("15-03-2024_Pune_C1.csv"), latin1).unwrap();

        let tables = CsvFolderIngestor::default().ingest(dir.path()).unwrap();

        assert_eq!(tables.frequencies.records(), &[ErrorFrequencyRecord::new("I_BP_LOW", 2)]);
        assert_eq!(tables.sources.len(), 2);
        assert!(tables.sources[0].error.is_none());
        let skipped = &tables.sources[1];
        assert_eq!(skipped.name, "15-03-2024_Pune_C1.csv");
        assert_eq!(skipped.rows, 0);
        assert!(skipped.error.is_some());
    }

    #[test]
    fn test_load_fails_when_no_file_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), [b'D', 0xFF, 0xFE]).unwrap();

        let err = CsvFolderIngestor::default().ingest(dir.path()).unwrap_err();
        assert!(matches!(err, AnalyticsError::Ingest { .. }));
    }

    #[test]
    fn test_quoted_line_break_splits_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "Description,Note\nBRAKE_ERROR,\"line one\nline two\"").unwrap();

        let tables = CsvFolderIngestor::default().ingest(&path).unwrap();

        assert_eq!(
            tables.frequencies.records(),
            &[ErrorFrequencyRecord::new("BRAKE_ERROR", 1), ErrorFrequencyRecord::new("line two", 1)]
        );
        assert_eq!(tables.details.records()[0].get("Note"), Some("line one"));
    }

    #[test]
    fn test_short_rows_pad_with_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "Description,Nr,Code\nBRAKE_ERROR,7").unwrap();

        let tables = CsvFolderIngestor::default().ingest(&path).unwrap();
        let record = &tables.details.records()[0];
        assert_eq!(record.get("Nr"), Some("7"));
        assert_eq!(record.get("Code"), Some(""));
    }
}
