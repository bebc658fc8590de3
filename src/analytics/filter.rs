//! Search, selection and sort over the frequency table
//!
//! The working view is derived in a fixed order:
//!
//! 1. **Search**: case-insensitive substring match on `description`. An empty
//!    term matches every row. The rows that pass are the *candidates* shown in
//!    the selection list, and "select all" acts on exactly these.
//! 2. **Selection**: keep candidates whose description is selected. No
//!    selection means an empty view, never the full table.
//! 3. **Sort**: stable, by the chosen key and direction, ties broken by
//!    `description` ascending.
//!
//! Everything here is a pure function of its arguments.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::{ErrorFrequencyRecord, FrequencyTable, SortKey};

/// Stage 1 alone: rows whose description contains `search_term`, ignoring case,
/// in table order.
pub fn matching<'a>(table: &'a FrequencyTable, search_term: &str) -> Vec<&'a ErrorFrequencyRecord> {
    let needle = search_term.to_lowercase();
    table
        .iter()
        .filter(|r| needle.is_empty() || r.description.to_lowercase().contains(&needle))
        .collect()
}

/// Derive the working view.
pub fn apply(
    table: &FrequencyTable,
    search_term: &str,
    selected: &BTreeSet<String>,
    sort_key: SortKey,
    ascending: bool,
) -> Vec<ErrorFrequencyRecord> {
    if selected.is_empty() {
        return Vec::new();
    }

    let mut view: Vec<ErrorFrequencyRecord> = matching(table, search_term)
        .into_iter()
        .filter(|r| selected.contains(&r.description))
        .cloned()
        .collect();

    sort_view(&mut view, sort_key, ascending);
    view
}

/// Stable sort in place; equal keys fall back to `description` ascending.
pub fn sort_view(view: &mut [ErrorFrequencyRecord], sort_key: SortKey, ascending: bool) {
    view.sort_by(|a, b| compare(a, b, sort_key, ascending));
}

fn compare(
    a: &ErrorFrequencyRecord,
    b: &ErrorFrequencyRecord,
    sort_key: SortKey,
    ascending: bool,
) -> Ordering {
    let primary = match sort_key {
        SortKey::Description => a.description.cmp(&b.description),
        SortKey::Frequency => a.frequency.cmp(&b.frequency),
    };
    let primary = if ascending { primary } else { primary.reverse() };

    primary.then_with(|| a.description.cmp(&b.description))
}
