//! Per-session UI state
//!
//! [`SelectionState`] is the only mutable state of a session. The session owns
//! it; the filter, metrics and chart code only ever read it.
//!
//! Two invariants hold after every mutation:
//!
//! - `selected_errors` ⊆ descriptions of the current frequency table
//! - `selected_fields` ⊆ columns of the current detail table
//!
//! Mutators that take a name therefore need the table to check against, and
//! [`SelectionState::prune`] restores both invariants after a reload.

use serde::Serialize;
use std::collections::BTreeSet;

use super::chart::{ChartKind, ChartToggles};
use crate::model::{DetailTable, FrequencyTable, SortKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub selected_errors: BTreeSet<String>,
    pub selected_fields: BTreeSet<String>,
    pub search_term: String,
    pub sort_key: SortKey,
    pub sort_ascending: bool,
    pub chart_kind: ChartKind,
    pub axes_swapped: bool,
    pub show_percentage: bool,
    /// Description picked for the detail panel
    pub inspected: Option<String>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected_errors: BTreeSet::new(),
            selected_fields: BTreeSet::new(),
            search_term: String::new(),
            sort_key: SortKey::Description,
            sort_ascending: true,
            chart_kind: ChartKind::Bar,
            axes_swapped: false,
            show_percentage: true,
            inspected: None,
        }
    }
}

/// What [`SelectionState::prune`] dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pruned {
    pub errors: Vec<String>,
    pub fields: Vec<String>,
}

impl Pruned {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.fields.is_empty()
    }
}

impl SelectionState {
    pub fn has_selection(&self) -> bool {
        !self.selected_errors.is_empty()
    }

    pub fn toggles(&self) -> ChartToggles {
        ChartToggles {
            axes_swapped: self.axes_swapped,
            show_percentage: self.show_percentage,
        }
    }

    /// Select `description` if the table knows it. Returns whether it changed.
    pub fn select(&mut self, table: &FrequencyTable, description: &str) -> bool {
        if !table.contains(description) {
            return false;
        }
        self.selected_errors.insert(description.to_string())
    }

    pub fn deselect(&mut self, description: &str) -> bool {
        let removed = self.selected_errors.remove(description);
        if removed {
            self.settle_inspected();
        }
        removed
    }

    /// Checkbox behaviour: flip membership of a known description.
    pub fn toggle(&mut self, table: &FrequencyTable, description: &str) -> bool {
        if self.selected_errors.contains(description) {
            self.deselect(description)
        } else {
            self.select(table, description)
        }
    }

    /// Replace the selection with `candidates`, the rows passing the current search.
    pub fn select_all<'a>(&mut self, candidates: impl IntoIterator<Item = &'a str>) {
        self.selected_errors = candidates.into_iter().map(str::to_string).collect();
        self.settle_inspected();
    }

    pub fn clear(&mut self) {
        self.selected_errors.clear();
        self.inspected = None;
    }

    pub fn set_sort(&mut self, key: SortKey, ascending: bool) {
        self.sort_key = key;
        self.sort_ascending = ascending;
    }

    pub fn swap_axes(&mut self) {
        self.axes_swapped = !self.axes_swapped;
    }

    pub fn toggle_annotation(&mut self) {
        self.show_percentage = !self.show_percentage;
    }

    /// Replace the detail columns, keeping only ones the detail table has.
    pub fn set_fields<'a>(&mut self, details: &DetailTable, fields: impl IntoIterator<Item = &'a str>) {
        self.selected_fields = fields
            .into_iter()
            .filter(|f| details.has_column(f))
            .map(str::to_string)
            .collect();
    }

    /// Pick a selected description for the detail panel.
    pub fn inspect(&mut self, description: &str) -> bool {
        if !self.selected_errors.contains(description) {
            return false;
        }
        self.inspected = Some(description.to_string());
        true
    }

    /// Drop selections that no longer exist after the tables were replaced.
    pub fn prune(&mut self, table: &FrequencyTable, details: &DetailTable) -> Pruned {
        let known = table.descriptions();
        let (keep, stale): (BTreeSet<String>, BTreeSet<String>) = std::mem::take(&mut self.selected_errors)
            .into_iter()
            .partition(|d| known.contains(d.as_str()));
        self.selected_errors = keep;

        let (keep, stale_fields): (BTreeSet<String>, BTreeSet<String>) =
            std::mem::take(&mut self.selected_fields)
                .into_iter()
                .partition(|f| details.has_column(f));
        self.selected_fields = keep;

        self.settle_inspected();

        Pruned {
            errors: stale.into_iter().collect(),
            fields: stale_fields.into_iter().collect(),
        }
    }

    // Inspection falls back to the first selected description (ascending)
    fn settle_inspected(&mut self) {
        let still_selected = self
            .inspected
            .as_ref()
            .is_some_and(|d| self.selected_errors.contains(d));
        if !still_selected {
            self.inspected = self.selected_errors.iter().next().cloned();
        }
    }

    /// The description the detail panel shows, if any.
    pub fn inspected_or_first(&self) -> Option<&str> {
        self.inspected
            .as_deref()
            .filter(|d| self.selected_errors.contains(*d))
            .or_else(|| self.selected_errors.iter().next().map(String::as_str))
    }
}
