//! Analytics session: the one owner of [`SelectionState`]
//!
//! A session is a synchronous reducer. Each [`Event`] is applied to the
//! selection, the working view is derived again from scratch, and a
//! [`RenderBundle`] describes everything the presentation layer needs.
//!
//! ```text
//!            load (non-empty)                 select / select all
//!   Empty ─────────────────────► NoSelection ◄───────────────────► WithSelection
//!     ▲  load (empty): stays          │           clear / deselect last
//!     └───────────────────────────────┘
//! ```
//!
//! `NoSelection`/`WithSelection` depend only on whether any error is
//! selected. An empty working view never reaches the metrics or chart code;
//! the bundle carries a [`NoDataReason`] instead.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analytics::chart::{self, ChartKind, ChartSpec, ChartToggles};
use crate::analytics::color::Palette;
use crate::analytics::filter;
use crate::analytics::metrics::{self, Metrics};
use crate::analytics::selection::SelectionState;
use crate::error::{AnalyticsError, Result};
use crate::model::{ErrorFrequencyRecord, SortKey, SourceFile, SourceTables};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    LoadedNoSelection,
    LoadedWithSelection,
}

/// A user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Search { term: String },
    ToggleError { description: String },
    SelectError { description: String },
    DeselectError { description: String },
    /// Select every row passing the current search
    SelectAllMatching,
    ClearSelection,
    SetSort { key: SortKey, ascending: bool },
    SwapAxes,
    ToggleAnnotation,
    SetChartKind { kind: ChartKind },
    SetFields { fields: Vec<String> },
    InspectError { description: String },
}

/// Why there is nothing to chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    NoDataLoaded,
    EmptySelection,
    /// Errors are selected but the search hides all of them
    NoMatchingErrors,
}

impl NoDataReason {
    pub fn message(&self) -> &'static str {
        match self {
            NoDataReason::NoDataLoaded => "No data loaded. Please load CSV files to begin analysis.",
            NoDataReason::EmptySelection => "No data to display. Please select errors to visualize.",
            NoDataReason::NoMatchingErrors => "No selected errors match the current search.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailStatus {
    Ready,
    NoFieldsSelected,
    NoDetails,
}

/// Detail rows for one selected error, projected onto the chosen fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub description: String,
    /// Every selected error, ascending; the choices for `description`
    pub choices: Vec<String>,
    pub fields: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub status: DetailStatus,
}

/// Everything the presentation layer draws after one update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderBundle {
    pub state: SessionState,
    /// Rows passing the search, for the selection list
    pub candidates: Vec<ErrorFrequencyRecord>,
    pub working_view: Vec<ErrorFrequencyRecord>,
    pub metrics: Option<Metrics>,
    pub chart: ChartSpec,
    pub no_data_reason: Option<NoDataReason>,
    pub chart_kind: ChartKind,
    pub toggles: ChartToggles,
    pub sort_key: SortKey,
    pub sort_ascending: bool,
    pub search_term: String,
    pub selected_errors: Vec<String>,
    /// Selected detail columns, in table order
    pub selected_fields: Vec<String>,
    pub available_fields: Vec<String>,
    pub details: Option<DetailView>,
    pub sources: Vec<SourceFile>,
}

/// One user's analytics session.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsSession {
    tables: Option<SourceTables>,
    selection: SelectionState,
    palette: Palette,
}

impl AnalyticsSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a preconfigured selection (sort, chart kind, toggles).
    pub fn with_selection(selection: SelectionState) -> Self {
        Self { tables: None, selection, palette: Palette::qualitative() }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn tables(&self) -> Option<&SourceTables> {
        self.tables.as_ref()
    }

    pub fn state(&self) -> SessionState {
        match (&self.tables, self.selection.has_selection()) {
            (None, _) => SessionState::Empty,
            (Some(_), false) => SessionState::LoadedNoSelection,
            (Some(_), true) => SessionState::LoadedWithSelection,
        }
    }

    /// Replace the source tables. An empty frequency table is rejected and
    /// leaves the session as it was.
    pub fn load(&mut self, tables: SourceTables) -> Result<RenderBundle> {
        if tables.frequencies.is_empty() {
            warn!("rejected load: frequency table is empty");
            return Err(AnalyticsError::NoDataLoaded);
        }

        let pruned = self.selection.prune(&tables.frequencies, &tables.details);
        if !pruned.is_empty() {
            debug!(errors = ?pruned.errors, fields = ?pruned.fields, "dropped stale selections");
        }

        info!(
            errors = tables.frequencies.len(),
            rows = tables.details.len(),
            columns = tables.details.columns().len(),
            "loaded source tables"
        );
        self.tables = Some(tables);

        Ok(self.render())
    }

    /// Apply one event and render.
    pub fn handle(&mut self, event: Event) -> RenderBundle {
        debug!(?event, "handling event");
        self.apply(event);
        self.render()
    }

    fn apply(&mut self, event: Event) {
        let selection = &mut self.selection;

        match event {
            Event::Search { term } => selection.search_term = term,
            Event::SetSort { key, ascending } => selection.set_sort(key, ascending),
            Event::SwapAxes => selection.swap_axes(),
            Event::ToggleAnnotation => selection.toggle_annotation(),
            Event::SetChartKind { kind } => selection.chart_kind = kind,
            Event::ClearSelection => selection.clear(),
            Event::DeselectError { description } => {
                selection.deselect(&description);
            }
            Event::InspectError { description } => {
                selection.inspect(&description);
            }
            // The rest needs a table to validate against
            event => {
                let Some(tables) = &self.tables else {
                    debug!(?event, "ignored: no data loaded");
                    return;
                };
                match event {
                    Event::ToggleError { description } => {
                        selection.toggle(&tables.frequencies, &description);
                    }
                    Event::SelectError { description } => {
                        selection.select(&tables.frequencies, &description);
                    }
                    Event::SelectAllMatching => {
                        let candidates = filter::matching(&tables.frequencies, &selection.search_term);
                        selection.select_all(candidates.iter().map(|r| r.description.as_str()));
                    }
                    Event::SetFields { fields } => {
                        selection.set_fields(&tables.details, fields.iter().map(String::as_str));
                    }
                    _ => {}
                }
            }
        }
    }

    /// Derive the bundle for the current state without changing anything.
    pub fn render(&self) -> RenderBundle {
        let selection = &self.selection;
        let mut bundle = RenderBundle {
            state: self.state(),
            candidates: Vec::new(),
            working_view: Vec::new(),
            metrics: None,
            chart: ChartSpec::NoData,
            no_data_reason: None,
            chart_kind: selection.chart_kind,
            toggles: selection.toggles(),
            sort_key: selection.sort_key,
            sort_ascending: selection.sort_ascending,
            search_term: selection.search_term.clone(),
            selected_errors: selection.selected_errors.iter().cloned().collect(),
            selected_fields: Vec::new(),
            available_fields: Vec::new(),
            details: None,
            sources: Vec::new(),
        };

        let Some(tables) = &self.tables else {
            bundle.no_data_reason = Some(NoDataReason::NoDataLoaded);
            return bundle;
        };

        bundle.candidates = filter::matching(&tables.frequencies, &selection.search_term)
            .into_iter()
            .cloned()
            .collect();
        bundle.available_fields = tables.details.columns().to_vec();
        bundle.selected_fields = self.ordered_fields();
        bundle.sources = tables.sources.clone();
        bundle.details = self.details(None);

        let view = filter::apply(
            &tables.frequencies,
            &selection.search_term,
            &selection.selected_errors,
            selection.sort_key,
            selection.sort_ascending,
        );
        debug!(rows = view.len(), state = ?bundle.state, "derived working view");

        if view.is_empty() {
            bundle.no_data_reason = Some(if selection.has_selection() {
                NoDataReason::NoMatchingErrors
            } else {
                NoDataReason::EmptySelection
            });
            return bundle;
        }

        // The view is non-empty, so this cannot fail
        let metrics = metrics::summarize(&view).ok();
        debug_assert!(metrics.is_some(), "metrics requested for an empty view");

        bundle.metrics = metrics;
        bundle.chart = chart::build(selection.chart_kind, &view, &self.palette, selection.toggles());
        bundle.working_view = view;
        bundle
    }

    /// Detail rows for `description`, or for the inspected error when `None`.
    /// Only selected errors can be inspected.
    pub fn details(&self, description: Option<&str>) -> Option<DetailView> {
        let tables = self.tables.as_ref()?;
        let description = match description {
            Some(d) if self.selection.selected_errors.contains(d) => d,
            Some(_) => return None,
            None => self.selection.inspected_or_first()?,
        };

        let fields = self.ordered_fields();
        let records: Vec<_> = tables.details.records_for(description).collect();

        let status = if records.is_empty() {
            DetailStatus::NoDetails
        } else if fields.is_empty() {
            DetailStatus::NoFieldsSelected
        } else {
            DetailStatus::Ready
        };

        let rows = if status == DetailStatus::Ready {
            records
                .iter()
                .map(|r| fields.iter().map(|f| r.get(f).unwrap_or_default().to_string()).collect())
                .collect()
        } else {
            Vec::new()
        };

        Some(DetailView {
            description: description.to_string(),
            choices: self.selection.selected_errors.iter().cloned().collect(),
            fields,
            rows,
            status,
        })
    }

    fn ordered_fields(&self) -> Vec<String> {
        self.tables
            .as_ref()
            .map(|t| {
                t.details
                    .columns()
                    .iter()
                    .filter(|c| self.selection.selected_fields.contains(*c))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
