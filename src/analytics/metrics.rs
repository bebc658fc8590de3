//! Aggregate metrics over the working view

use serde::Serialize;

use crate::error::{AnalyticsError, Result};
use crate::model::ErrorFrequencyRecord;

/// Summary cards shown above the chart: total, most common error, its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub total_count: u64,
    pub mode_description: String,
    pub mode_frequency: u64,
    /// `total_count` with thousands grouping
    pub total_display: String,
    /// `mode_frequency` with thousands grouping
    pub mode_frequency_display: String,
}

/// Summarize a non-empty working view.
///
/// The mode is the first row holding the maximum frequency *in the view's
/// current order*, so with tied counts the reported "most common error"
/// follows the active sort.
pub fn summarize(view: &[ErrorFrequencyRecord]) -> Result<Metrics> {
    let mut mode: Option<&ErrorFrequencyRecord> = None;
    let mut total: u64 = 0;

    for record in view {
        total = total.saturating_add(record.frequency);
        if mode.map_or(true, |m| record.frequency > m.frequency) {
            mode = Some(record);
        }
    }

    let mode = mode.ok_or(AnalyticsError::EmptyInput)?;

    Ok(Metrics {
        total_count: total,
        mode_description: mode.description.clone(),
        mode_frequency: mode.frequency,
        total_display: group_thousands(total),
        mode_frequency_display: group_thousands(mode.frequency),
    })
}

/// `1234567` → `"1,234,567"`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}
