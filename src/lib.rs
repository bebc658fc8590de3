//! Brakescope - explore error frequencies from brake-system logs
//!
//! Brake control units log every fault they raise. Brakescope takes the
//! per-error counts from those logs and lets an operator pick which errors to
//! look at, see the totals, and compare them as a bar chart, pie chart or
//! treemap.
//!
//! # Overview
//!
//! The heart of the crate is a small pipeline:
//!
//! 1. **Search + selection**: a case-insensitive search narrows the error list;
//!    the operator ticks the errors to analyze.
//! 2. **Sort**: by description or frequency, either direction, ties broken by
//!    description.
//! 3. **Metrics**: total count, most common error, highest frequency.
//! 4. **Chart**: a fully resolved [`ChartSpec`] (colours, labels, layout hints)
//!    that any front end can draw.
//!
//! An [`AnalyticsSession`] owns the selection and runs the pipeline after
//! every [`Event`].
//!
//! # Quick Start
//!
//! ```no_run
//! use brakescope::{AnalyticsSession, CsvFolderIngestor, Event, LogIngestor};
//!
//! let tables = CsvFolderIngestor::default().ingest("logs/".as_ref())?;
//!
//! let mut session = AnalyticsSession::new();
//! session.load(tables)?;
//! let bundle = session.handle(Event::SelectAllMatching);
//!
//! if let Some(metrics) = &bundle.metrics {
//!     println!("Total errors: {}", metrics.total_display);
//!     println!("Most common: {}", metrics.mode_description);
//! }
//! # Ok::<(), brakescope::AnalyticsError>(())
//! ```
//!
//! # Modules
//!
//! - [`analytics`]: filter, metrics, colours and chart building
//! - [`session`]: the per-user state machine
//! - [`ingest`]: loading CSV exports into source tables
//! - [`report`]: HTML and JSON output
//! - [`serve`]: interactive local web UI

pub mod analytics;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod report;
pub mod serve;
pub mod session;

pub use analytics::{ChartKind, ChartSpec, ChartToggles, Metrics, Palette, SelectionState};
pub use config::Config;
pub use error::{AnalyticsError, Result};
pub use ingest::{CsvFolderIngestor, LogIngestor};
pub use model::{
    DetailTable, ErrorDetailRecord, ErrorFrequencyRecord, FrequencyTable, SortKey, SourceTables,
};
pub use session::{AnalyticsSession, Event, NoDataReason, RenderBundle, SessionState};
