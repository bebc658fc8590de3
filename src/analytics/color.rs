//! Chart colours
//!
//! Two schemes are used:
//!
//! - [`Palette`]: a discrete, ordered list of hues. Row `i` of the working
//!   view gets `palette[i mod L]`. The colour follows the row's *position*,
//!   not its description, so re-rendering the same view keeps every colour
//!   while changing the selection or sort order may reassign them.
//! - [`ContinuousScale`]: a sequential scale sampled by a value in `0.0..=1.0`.
//!   The treemap uses it to show magnitude rather than identity.

/// Anything that can hand out a colour for a position in the working view.
pub trait ColorSource {
    fn color_for(&self, index: usize) -> &'static str;
}

// Set3 + Pastel1 + Set1 + Pastel2 + Set2, in that order. Pastel1's #CCEBC5
// already appears in Set3 and is left out so every entry is distinct.
const QUALITATIVE: &[&str] = &[
    // Set3
    "#8DD3C7", "#FFFFB3", "#BEBADA", "#FB8072", "#80B1D3", "#FDB462",
    "#B3DE69", "#FCCDE5", "#D9D9D9", "#BC80BD", "#CCEBC5", "#FFED6F",
    // Pastel1
    "#FBB4AE", "#B3CDE3", "#DECBE4", "#FED9A6", "#FFFFCC", "#E5D8BD",
    "#FDDAEC", "#F2F2F2",
    // Set1
    "#E41A1C", "#377EB8", "#4DAF4A", "#984EA3", "#FF7F00", "#FFFF33",
    "#A65628", "#F781BF", "#999999",
    // Pastel2
    "#B3E2CD", "#FDCDAC", "#CBD5E8", "#F4CAE4", "#E6F5C9", "#FFF2AE",
    "#F1E2CC", "#CCCCCC",
    // Set2
    "#66C2A5", "#FC8D62", "#8DA0CB", "#E78AC3", "#A6D854", "#FFD92F",
    "#E5C494", "#B3B3B3",
];

const VIRIDIS: &[(u8, u8, u8)] = &[
    (0x44, 0x01, 0x54),
    (0x48, 0x28, 0x78),
    (0x3E, 0x49, 0x89),
    (0x31, 0x68, 0x8E),
    (0x26, 0x82, 0x8E),
    (0x1F, 0x9E, 0x89),
    (0x35, 0xB7, 0x79),
    (0x6E, 0xCE, 0x58),
    (0xB5, 0xDE, 0x2B),
    (0xFD, 0xE7, 0x25),
];

/// Fixed, ordered list of hex colours cycled by position.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    colors: &'static [&'static str],
}

impl Palette {
    /// The default 45-colour qualitative palette.
    pub fn qualitative() -> Self {
        Self { colors: QUALITATIVE }
    }

    /// A custom palette. Falls back to the qualitative one when `colors` is empty.
    pub fn from_static(colors: &'static [&'static str]) -> Self {
        if colors.is_empty() {
            Self::qualitative()
        } else {
            Self { colors }
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &'static [&'static str] {
        self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::qualitative()
    }
}

impl ColorSource for Palette {
    fn color_for(&self, index: usize) -> &'static str {
        self.colors[index % self.colors.len()]
    }
}

/// Sequential colour scale with linear interpolation between stops.
#[derive(Debug, Clone, Copy)]
pub struct ContinuousScale {
    name: &'static str,
    stops: &'static [(u8, u8, u8)],
}

impl ContinuousScale {
    pub fn viridis() -> Self {
        Self { name: "Viridis", stops: VIRIDIS }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Colour at `t`, clamped to `0.0..=1.0`. NaN is treated as 0.
    pub fn sample(&self, t: f64) -> String {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let last = self.stops.len() - 1;
        let pos = t * last as f64;
        let lo = (pos.floor() as usize).min(last);
        let hi = (lo + 1).min(last);
        let frac = pos - lo as f64;

        let (r0, g0, b0) = self.stops[lo];
        let (r1, g1, b1) = self.stops[hi];
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;

        format!("#{:02X}{:02X}{:02X}", mix(r0, r1), mix(g0, g1), mix(b0, b1))
    }
}

impl Default for ContinuousScale {
    fn default() -> Self {
        Self::viridis()
    }
}
