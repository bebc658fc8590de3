//! Chart descriptions built from the working view
//!
//! A [`ChartSpec`] is plain data: every bar, slice or leaf with its value,
//! colour and label already resolved. Turning it into pixels is up to the
//! presentation layer (the HTML report and the serve UI draw it with D3).
//!
//! | Kind | Colour | Label |
//! |------|--------|-------|
//! | Bar | palette by position | percentage of total or grouped raw value |
//! | Pie | palette by position | description + percentage |
//! | Treemap | continuous scale by magnitude | description |

use serde::{Deserialize, Serialize};
use std::fmt;

use super::color::{ColorSource, ContinuousScale};
use super::metrics::group_thousands;
use crate::model::ErrorFrequencyRecord;

pub const BAR_TITLE: &str = "Error Frequency Distribution";
pub const PIE_TITLE: &str = "Error Distribution by Percentage";
pub const TREEMAP_TITLE: &str = "Error Distribution Treemap";
pub const TREEMAP_ROOT: &str = "All errors";

const CATEGORY_AXIS: &str = "Error Description";
const VALUE_AXIS: &str = "Frequency";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Pie,
    Treemap,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "Bar Chart"),
            ChartKind::Pie => write!(f, "Pie Chart"),
            ChartKind::Treemap => write!(f, "Treemap"),
        }
    }
}

/// Bar-chart switches. Pie and treemap ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartToggles {
    pub axes_swapped: bool,
    pub show_percentage: bool,
}

impl Default for ChartToggles {
    fn default() -> Self {
        Self { axes_swapped: false, show_percentage: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Categories along x, bars grow upwards
    Vertical,
    /// Categories along y, bars grow to the right
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationMode {
    Percentage,
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub category: String,
    pub value: u64,
    pub percentage: f64,
    pub color: String,
    pub annotation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub orientation: Orientation,
    pub annotation_mode: AnnotationMode,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: u64,
    pub percentage: f64,
    pub color: String,
    /// `"<description> (<pct>%)"`
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<Slice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreemapLeaf {
    pub label: String,
    pub parent: String,
    pub value: u64,
    /// Fraction of the total area, `0.0..=1.0`
    pub share: f64,
    /// Position on the colour scale, `0.0..=1.0`
    pub intensity: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Treemap {
    pub title: String,
    pub root: String,
    pub total: u64,
    pub color_scale: String,
    pub min: u64,
    pub max: u64,
    pub leaves: Vec<TreemapLeaf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartSpec {
    Bar(BarChart),
    Pie(PieChart),
    Treemap(Treemap),
    /// The view was empty; nothing to draw
    NoData,
}

impl ChartSpec {
    pub fn is_no_data(&self) -> bool {
        matches!(self, ChartSpec::NoData)
    }

    pub fn kind(&self) -> Option<ChartKind> {
        match self {
            ChartSpec::Bar(_) => Some(ChartKind::Bar),
            ChartSpec::Pie(_) => Some(ChartKind::Pie),
            ChartSpec::Treemap(_) => Some(ChartKind::Treemap),
            ChartSpec::NoData => None,
        }
    }
}

/// Build the chart for `view`, which is drawn in the order given.
pub fn build(
    kind: ChartKind,
    view: &[ErrorFrequencyRecord],
    colors: &dyn ColorSource,
    toggles: ChartToggles,
) -> ChartSpec {
    if view.is_empty() {
        return ChartSpec::NoData;
    }

    match kind {
        ChartKind::Bar => ChartSpec::Bar(bar_chart(view, colors, toggles)),
        ChartKind::Pie => ChartSpec::Pie(pie_chart(view, colors)),
        ChartKind::Treemap => ChartSpec::Treemap(treemap(view, &ContinuousScale::viridis())),
    }
}

/// Share of `total` in percent; 0 when the total is 0.
pub fn percentage(frequency: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * frequency as f64 / total as f64
    }
}

pub fn format_percentage(pct: f64) -> String {
    format!("{:.1}%", pct)
}

fn total_of(view: &[ErrorFrequencyRecord]) -> u64 {
    view.iter().fold(0u64, |acc, r| acc.saturating_add(r.frequency))
}

fn bar_chart(view: &[ErrorFrequencyRecord], colors: &dyn ColorSource, toggles: ChartToggles) -> BarChart {
    let total = total_of(view);
    let annotation_mode = if toggles.show_percentage {
        AnnotationMode::Percentage
    } else {
        AnnotationMode::Value
    };

    let bars = view
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let pct = percentage(r.frequency, total);
            Bar {
                category: r.description.clone(),
                value: r.frequency,
                percentage: pct,
                color: colors.color_for(i).to_string(),
                annotation: match annotation_mode {
                    AnnotationMode::Percentage => format_percentage(pct),
                    AnnotationMode::Value => group_thousands(r.frequency),
                },
            }
        })
        .collect();

    let (orientation, x_axis_title, y_axis_title) = if toggles.axes_swapped {
        (Orientation::Horizontal, VALUE_AXIS, CATEGORY_AXIS)
    } else {
        (Orientation::Vertical, CATEGORY_AXIS, VALUE_AXIS)
    };

    BarChart {
        title: BAR_TITLE.to_string(),
        orientation,
        annotation_mode,
        x_axis_title: x_axis_title.to_string(),
        y_axis_title: y_axis_title.to_string(),
        bars,
    }
}

fn pie_chart(view: &[ErrorFrequencyRecord], colors: &dyn ColorSource) -> PieChart {
    let total = total_of(view);

    let slices = view
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let pct = percentage(r.frequency, total);
            Slice {
                label: r.description.clone(),
                value: r.frequency,
                percentage: pct,
                color: colors.color_for(i).to_string(),
                text: format!("{} ({})", r.description, format_percentage(pct)),
            }
        })
        .collect();

    PieChart { title: PIE_TITLE.to_string(), slices }
}

fn treemap(view: &[ErrorFrequencyRecord], scale: &ContinuousScale) -> Treemap {
    let total = total_of(view);
    let min = view.iter().map(|r| r.frequency).min().unwrap_or(0);
    let max = view.iter().map(|r| r.frequency).max().unwrap_or(0);
    let range = max - min;

    let leaves = view
        .iter()
        .map(|r| {
            let intensity = if range == 0 {
                1.0
            } else {
                (r.frequency - min) as f64 / range as f64
            };
            TreemapLeaf {
                label: r.description.clone(),
                parent: TREEMAP_ROOT.to_string(),
                value: r.frequency,
                share: percentage(r.frequency, total) / 100.0,
                intensity,
                color: scale.sample(intensity),
            }
        })
        .collect();

    Treemap {
        title: TREEMAP_TITLE.to_string(),
        root: TREEMAP_ROOT.to_string(),
        total,
        color_scale: scale.name().to_string(),
        min,
        max,
        leaves,
    }
}
