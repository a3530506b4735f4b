//! Tree layout algorithms.
//!
//! Each layout assigns data-space coordinates (`x`, `y`) and the parent
//! projection (`px`, `py`) to every node in place. Screen mapping happens
//! later in [`crate::scale`].

pub mod clock;
pub mod distance;
pub mod radial;
pub mod rectangular;
pub mod regression;
pub mod unrooted;

use std::fmt;
use std::str::FromStr;

use color_eyre::eyre::{Report, Result, eyre};
use serde::{Deserialize, Serialize};

use crate::tree::TreeArena;

pub use distance::set_distance;
pub use regression::Regression;

/// Layout mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// x = distance, y = leaf order; elbow branches.
    #[serde(alias = "rect")]
    Rectangular,
    /// Leaf order mapped to angle, distance to radius.
    Radial,
    /// Equal-angle layout.
    Unrooted,
    /// Root-to-tip divergence against sampling date.
    Clock,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Rectangular => "rect",
            LayoutMode::Radial => "radial",
            LayoutMode::Unrooted => "unrooted",
            LayoutMode::Clock => "clock",
        }
    }

    /// Radial and unrooted layouts need square scales.
    pub fn is_square(self) -> bool {
        matches!(self, LayoutMode::Radial | LayoutMode::Unrooted)
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rect" | "rectangular" => Ok(LayoutMode::Rectangular),
            "radial" => Ok(LayoutMode::Radial),
            "unrooted" => Ok(LayoutMode::Unrooted),
            "clock" => Ok(LayoutMode::Clock),
            other => Err(eyre!("unknown layout `{other}`")),
        }
    }
}

/// Trait used as branch length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceMeasure {
    #[serde(rename = "div")]
    Div,
    #[serde(rename = "num_date")]
    NumDate,
}

impl DistanceMeasure {
    /// Trait key read from each node.
    pub fn key(self) -> &'static str {
        match self {
            DistanceMeasure::Div => "div",
            DistanceMeasure::NumDate => "num_date",
        }
    }
}

impl fmt::Display for DistanceMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DistanceMeasure {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "div" => Ok(DistanceMeasure::Div),
            "num_date" => Ok(DistanceMeasure::NumDate),
            other => Err(eyre!("unknown distance measure `{other}`")),
        }
    }
}

/// Compute coordinates for `mode` from the current depths.
///
/// Returns the root-to-tip regression for the clock layout.
pub fn apply_layout(arena: &mut TreeArena, mode: LayoutMode) -> Result<Option<Regression>> {
    match mode {
        LayoutMode::Rectangular => {
            rectangular::layout(arena);
            Ok(None)
        }
        LayoutMode::Radial => {
            radial::layout(arena);
            Ok(None)
        }
        LayoutMode::Unrooted => {
            unrooted::layout(arena);
            Ok(None)
        }
        LayoutMode::Clock => clock::layout(arena).map(Some),
    }
}
