//! Rendering parameters and options.
//!
//! All structs deserialize from partial JS objects: missing fields fall back
//! to the defaults below.

use serde::{Deserialize, Serialize};

/// Pixel margins around the drawing area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 25.0,
            right: 15.0,
            top: 5.0,
            bottom: 25.0,
        }
    }
}

/// Drawing surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// Tree drawing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeParams {
    pub margins: Margins,
    /// Sign of each entry flips the rectangular/clock x and y axes.
    pub orientation: [f64; 2],

    pub regression_stroke: String,
    pub regression_width: f64,
    pub major_grid_stroke: String,
    pub major_grid_width: f64,
    pub minor_grid_stroke: String,
    pub minor_grid_width: f64,
    pub tick_label_size: f64,
    pub tick_label_fill: String,
    /// Minor gridlines per major interval on a divergence axis.
    pub minor_ticks: u32,
    /// Minor gridlines per major interval on a calendar axis.
    pub minor_ticks_time_tree: u32,

    pub branch_stroke: String,
    pub branch_stroke_width: f64,
    pub tip_stroke: String,
    pub tip_fill: String,
    pub tip_stroke_width: f64,
    pub tip_radius: f64,

    pub branch_label_fill: String,
    pub branch_label_pad_x: f64,
    pub branch_label_pad_y: f64,
    pub tip_label_pad_x: f64,
    pub tip_label_pad_y: f64,
    /// Tip labels are drawn only below this many tips in view.
    pub tip_label_threshold: usize,

    /// Pointer distance in pixels that still counts as a hit.
    pub hit_radius: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            orientation: [1.0, 1.0],
            regression_stroke: "#333".to_string(),
            regression_width: 6.0,
            major_grid_stroke: "#CCC".to_string(),
            major_grid_width: 2.0,
            minor_grid_stroke: "#DDD".to_string(),
            minor_grid_width: 1.0,
            tick_label_size: 12.0,
            tick_label_fill: "#333".to_string(),
            minor_ticks: 4,
            minor_ticks_time_tree: 3,
            branch_stroke: "#AAA".to_string(),
            branch_stroke_width: 2.0,
            tip_stroke: "#AAA".to_string(),
            tip_fill: "#CCC".to_string(),
            tip_stroke_width: 1.0,
            tip_radius: 4.0,
            branch_label_fill: "#555".to_string(),
            branch_label_pad_x: 8.0,
            branch_label_pad_y: 5.0,
            tip_label_pad_x: 8.0,
            tip_label_pad_y: 2.0,
            tip_label_threshold: 50,
            hit_radius: 6.0,
        }
    }
}

/// Which optional elements to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    pub grid: bool,
    pub confidence: bool,
    pub branch_labels: bool,
    pub show_branch_labels: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            grid: true,
            confidence: false,
            branch_labels: false,
            show_branch_labels: false,
        }
    }
}
