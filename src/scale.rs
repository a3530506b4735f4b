//! Data-space to screen-space mapping.
//!
//! Domains are taken over in-view nodes only, so zooming into a clade makes
//! it fill the surface. Radial and unrooted layouts get square domains and
//! ranges because branch lengths run in both directions there.

use crate::config::{Surface, TreeParams};
use crate::layout::LayoutMode;
use crate::render::{BranchPaths, paths};
use crate::tree::{ScreenGeometry, TreeArena};

/// Half-width used to widen a zero-width x domain.
const ZERO_SPAN_PAD: f64 = 0.005;
/// Smallest x domain span allowed.
const MIN_X_SPAN: f64 = 1e-8;
/// Below this many tips in view the y domain is padded.
const SMALL_CLADE_TIPS: usize = 30;
const SMALL_CLADE_PAD: f64 = 0.05;

/// Invertible linear map from `domain` to `range`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    /// Map a data value to screen space. A zero-width domain maps to the
    /// middle of the range.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        let width = self.domain[1] - self.domain[0];
        let t = if width == 0.0 {
            0.5
        } else {
            (value - self.domain[0]) / width
        };
        self.range[0] + t * (self.range[1] - self.range[0])
    }

    /// Map a screen value back to data space.
    #[inline]
    pub fn invert(&self, value: f64) -> f64 {
        let width = self.range[1] - self.range[0];
        let t = if width == 0.0 {
            0.5
        } else {
            (value - self.range[0]) / width
        };
        self.domain[0] + t * (self.domain[1] - self.domain[0])
    }

    /// Signed extent of the range.
    #[inline]
    pub fn range_span(&self) -> f64 {
        self.range[1] - self.range[0]
    }
}

impl Default for LinearScale {
    fn default() -> Self {
        Self::new([0.0, 1.0], [0.0, 1.0])
    }
}

/// The x and y scales of the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scales {
    pub x: LinearScale,
    pub y: LinearScale,
}

/// Fits scales to the in-view nodes and maps every node to the screen.
pub struct ScaleMapper<'a> {
    pub layout: LayoutMode,
    pub surface: Surface,
    pub params: &'a TreeParams,
}

impl<'a> ScaleMapper<'a> {
    pub fn new(layout: LayoutMode, surface: Surface, params: &'a TreeParams) -> Self {
        Self {
            layout,
            surface,
            params,
        }
    }

    /// Pixel ranges for x and y.
    pub fn ranges(&self) -> ([f64; 2], [f64; 2]) {
        let m = &self.params.margins;
        let Surface { width, height } = self.surface;

        if self.layout.is_square() {
            let x_extent = width - m.left - m.right;
            let y_extent = height - m.top - m.bottom;
            let min_extent = x_extent.min(y_extent);
            let x_slack = x_extent - min_extent;
            let y_slack = y_extent - min_extent;
            (
                [0.5 * x_slack + m.left, width - 0.5 * x_slack - m.right],
                [0.5 * y_slack + m.top, height - 0.5 * y_slack - m.bottom],
            )
        } else {
            let x = [m.left, width - m.right];
            let y = [m.top, height - m.bottom];
            let flip = |r: [f64; 2], sign: f64| if sign > 0.0 { r } else { [r[1], r[0]] };
            (
                flip(x, self.params.orientation[0]),
                flip(y, self.params.orientation[1]),
            )
        }
    }

    /// Data domains over the in-view nodes.
    pub fn domains(&self, arena: &TreeArena) -> ([f64; 2], [f64; 2]) {
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for node in arena.nodes().iter().filter(|n| n.is_in_view()) {
            if node.x.is_finite() && node.y.is_finite() {
                min_x = min_x.min(node.x);
                max_x = max_x.max(node.x);
                min_y = min_y.min(node.y);
                max_y = max_y.max(node.y);
            }
        }
        if min_x > max_x {
            return ([0.0, 1.0], [0.0, 1.0]);
        }

        if min_x == max_x {
            min_x -= ZERO_SPAN_PAD;
            max_x += ZERO_SPAN_PAD;
        }
        let mut span_x = max_x - min_x;
        if span_x < MIN_X_SPAN {
            max_x = min_x + MIN_X_SPAN;
            span_x = MIN_X_SPAN;
        }

        if arena.tips_in_view() < SMALL_CLADE_TIPS {
            let delta = SMALL_CLADE_PAD * (max_y - min_y);
            min_y -= delta;
            max_y += delta;
        }
        let span_y = max_y - min_y;

        let mut x_domain = [min_x, max_x];
        let mut y_domain = [min_y, max_y];
        if self.layout.is_square() {
            let max_span = span_x.max(span_y);
            let y_slack = if span_x > span_y { 0.5 * (span_x - span_y) } else { 0.0 };
            let x_slack = if span_x < span_y { 0.5 * (span_y - span_x) } else { 0.0 };
            x_domain = [min_x - x_slack, min_x + max_span - x_slack];
            y_domain = [min_y - y_slack, min_y + max_span - y_slack];
        }
        if self.layout == LayoutMode::Clock {
            y_domain.reverse();
        }
        (x_domain, y_domain)
    }

    /// Fit both scales.
    pub fn fit(&self, arena: &TreeArena) -> Scales {
        let (x_range, y_range) = self.ranges();
        let (x_domain, y_domain) = self.domains(arena);
        Scales {
            x: LinearScale::new(x_domain, x_range),
            y: LinearScale::new(y_domain, y_range),
        }
    }

    /// Recompute the screen geometry of every node and flag the nodes whose
    /// geometry changed. Returns the number of flagged nodes.
    pub fn map_to_screen(&self, arena: &mut TreeArena, scales: &Scales, confidence: bool) -> usize {
        let default_width = self.params.branch_stroke_width;
        let offset = arena[arena.root()].depth;
        let (xs, ys) = (&scales.x, &scales.y);

        let mut changed = 0;
        for index in 0..arena.len() {
            let parent = arena.parent(index);
            let parent_width = arena[parent].branch_stroke_width().unwrap_or(default_width);
            let node = &arena[index];
            let own_width = node.branch_stroke_width().unwrap_or(default_width);
            let stem_offset = 0.5 * (parent_width - own_width);

            let x_tip = xs.apply(node.x);
            let y_tip = ys.apply(node.y);
            let x_base = xs.apply(node.px);
            let y_base = ys.apply(node.py);

            let (branch, conf_line) = match self.layout {
                LayoutMode::Rectangular => {
                    let branch = BranchPaths {
                        stem: paths::rect_stem(x_base, y_base, x_tip, y_tip, stem_offset),
                        bar: paths::rect_bar(
                            x_tip,
                            ys.apply(node.y_range[0]),
                            ys.apply(node.y_range[1]),
                        ),
                    };
                    let conf = confidence.then(|| {
                        paths::line(
                            [xs.apply(node.conf[0]), y_base],
                            [xs.apply(node.conf[1]), y_tip],
                        )
                    });
                    (branch, conf)
                }
                LayoutMode::Radial => {
                    let bar = node
                        .arc
                        .map(|arc| {
                            paths::radial_arc(
                                [xs.apply(arc.x_start), ys.apply(arc.y_start)],
                                [
                                    xs.apply(node.depth) - xs.apply(offset),
                                    ys.apply(node.depth) - ys.apply(offset),
                                ],
                                arc.small_big_arc,
                                [xs.apply(arc.x_end), ys.apply(arc.y_end)],
                            )
                        })
                        .unwrap_or_default();
                    let branch = BranchPaths {
                        stem: paths::radial_stem(
                            x_base,
                            y_base,
                            x_tip,
                            y_tip,
                            node.angle,
                            stem_offset,
                        ),
                        bar,
                    };
                    (branch, None)
                }
                LayoutMode::Unrooted | LayoutMode::Clock => {
                    let branch = BranchPaths {
                        stem: paths::straight(x_base, y_base, x_tip, y_tip),
                        bar: String::new(),
                    };
                    (branch, None)
                }
            };

            let geometry = ScreenGeometry {
                x_tip,
                y_tip,
                x_base,
                y_base,
                branch,
                conf_line,
            };
            let node = &mut arena[index];
            if node.screen != geometry {
                node.screen = geometry;
                node.state.set_update(true);
                changed += 1;
            }
        }
        changed
    }
}
