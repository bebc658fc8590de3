//! Selection, filtering, metrics and chart building
//!
//! The pipeline from a frequency table to something drawable:
//!
//! ```text
//! FrequencyTable ──► filter::apply ──► working view ──► metrics::summarize
//!        ▲               (search,             │
//!        │            selection, sort)        └────────► chart::build ──► ChartSpec
//! SelectionState ─────────┘                                  ▲
//!                                                  color::Palette
//! ```
//!
//! - [`selection`]: the mutable per-session state
//! - [`filter`]: search + selection + sort, pure
//! - [`metrics`]: total, most common error, highest frequency
//! - [`color`]: positional palette and the treemap's continuous scale
//! - [`chart`]: bar, pie and treemap descriptions

pub mod chart;
pub mod color;
pub mod filter;
pub mod metrics;
pub mod selection;

pub use chart::{ChartKind, ChartSpec, ChartToggles};
pub use color::{ColorSource, ContinuousScale, Palette};
pub use metrics::Metrics;
pub use selection::SelectionState;
