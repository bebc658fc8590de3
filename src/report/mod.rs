//! Report generation for a rendered session
//!
//! A report is a snapshot of one [`RenderBundle`]:
//!
//! - **HTML**: metric cards, the chart drawn with D3.js, and the working view
//! - **JSON**: the bundle as-is, for programmatic consumption
//!
//! # Usage
//!
//! ```ignore
//! use brakescope::report;
//!
//! // Picks the format from the extension
//! report::generate("report.html", &bundle)?;  // HTML
//! report::generate("report.json", &bundle)?;  // JSON
//! ```

pub mod html;

use crate::error::Result;
use crate::session::RenderBundle;
use std::io::Write;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, bundle: &RenderBundle) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);

    match ext.as_str() {
        "json" => write_json(&mut file, bundle)?,
        _ => html::write(&mut file, bundle)?,
    }
    file.flush()?;

    Ok(())
}

pub fn write_json<W: Write>(writer: &mut W, bundle: &RenderBundle) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, bundle)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorFrequencyRecord, SourceTables};
    use crate::session::{AnalyticsSession, Event};

    fn bundle() -> RenderBundle {
        let mut session = AnalyticsSession::new();
        session
            .load(SourceTables::from_frequencies(vec![
                ErrorFrequencyRecord::new("BrakeFail", 10),
                ErrorFrequencyRecord::new("SensorErr", 5),
            ]))
            .unwrap();
        session.handle(Event::SelectAllMatching)
    }

    // ==========================================================================
    // FORMAT SELECTION TESTS
    // ==========================================================================

    #[test]
    fn test_json_extension_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        generate(&path, &bundle()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["metrics"]["total_count"], 15);
        assert_eq!(json["chart"]["kind"], "bar");
        assert_eq!(json["state"], "loaded_with_selection");
    }

    #[test]
    fn test_other_extensions_write_html() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["report.html", "report.HTM", "report"] {
            let path = dir.path().join(name);
            generate(&path, &bundle()).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(text.starts_with("<!DOCTYPE html>"), "{name}");
        }
    }
}
