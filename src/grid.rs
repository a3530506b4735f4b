//! Gridlines and tick labels along the distance axis.
//!
//! Lines beyond the visible domain are kept but hidden, so the host can
//! animate between domains instead of popping lines in and out.

use crate::config::TreeParams;
use crate::layout::{DistanceMeasure, LayoutMode};
use crate::render::{ElementClass, PropertySet, RenderOp, paths};
use crate::scale::Scales;
use crate::tree::TreeArena;

/// Extra major lines past the end of the domain.
const MAJOR_OVERSHOOT: f64 = 3.0;
/// Extra minor lines past the end of the domain.
const MINOR_OVERSHOOT: f64 = 30.0;
/// Extra y lines past the end of the clock divergence domain.
const Y_OVERSHOOT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    pub axis: Axis,
    pub value: f64,
    pub visible: bool,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridTick {
    pub axis: Axis,
    pub value: f64,
    pub visible: bool,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub anchor: &'static str,
}

/// Gridlines and ticks for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub major: Vec<GridLine>,
    pub minor: Vec<GridLine>,
    pub ticks: Vec<GridTick>,
}

/// Major step for a domain of width `span`: a power of ten, refined so that
/// at least five steps fit.
pub fn major_step(span: f64) -> f64 {
    let mut step = 10f64.powf(span.log10().floor());
    if span / step < 2.0 {
        step /= 5.0;
    } else if span / step < 5.0 {
        step /= 2.0;
    }
    step
}

/// Decimals needed to print multiples of `step`.
pub fn tick_decimals(step: f64) -> usize {
    (-step.log10().floor()).max(0.0) as usize
}

fn line_count(span: f64, step: f64, overshoot: f64) -> usize {
    (span / step + overshoot).floor().max(0.0) as usize
}

pub struct GridAnnotator<'a> {
    pub layout: LayoutMode,
    pub distance: DistanceMeasure,
    pub params: &'a TreeParams,
}

impl<'a> GridAnnotator<'a> {
    pub fn new(layout: LayoutMode, distance: DistanceMeasure, params: &'a TreeParams) -> Self {
        Self {
            layout,
            distance,
            params,
        }
    }

    /// Compute the grid, or `None` when the layout has no grid or the domain
    /// is degenerate.
    pub fn annotate(&self, arena: &TreeArena, scales: &Scales) -> Option<Grid> {
        if self.layout == LayoutMode::Unrooted {
            return None;
        }
        let (xs, ys) = (&scales.x, &scales.y);
        let radial = self.layout == LayoutMode::Radial;

        let (xmin, xmax) = if radial {
            let xmin = arena[arena.root()].depth;
            let reach = xs.domain[1]
                .max(ys.domain[1])
                .max(-xs.domain[0])
                .max(-ys.domain[0]);
            (xmin, xmin + reach)
        } else {
            (xs.domain[0], xs.domain[1])
        };
        let span = xmax - xmin;
        if !(span.is_finite() && span > 0.0) {
            return None;
        }

        let view_top = ys.range[0];
        let view_bottom = ys.range[1];
        let centre = [xs.apply(0.0), ys.apply(0.0)];
        let line_at = |pos: f64| -> String {
            if radial {
                let x = xs.apply(pos - xmin);
                let radius_y = ys.apply(pos - xmin) - centre[1];
                paths::circle(centre, x, radius_y)
            } else {
                let x = xs.apply(pos);
                format!("M {x} {view_bottom} L {x} {view_top}")
            }
        };

        let step = major_step(span);
        let grid_min = (xmin / step).floor() * step;
        let min_visible = if radial { xmin } else { grid_min };
        let max_visible = xmax;
        let decimals = tick_decimals(step);

        let mut grid = Grid::default();
        for ii in 0..=line_count(xmax - grid_min, step, MAJOR_OVERSHOOT) {
            let pos = grid_min + step * ii as f64;
            let visible = !(pos < min_visible || pos > max_visible);
            grid.major.push(GridLine {
                axis: Axis::X,
                value: pos,
                visible,
                path: line_at(pos),
            });
            grid.ticks.push(GridTick {
                axis: Axis::X,
                value: pos,
                visible,
                text: format!("{pos:.decimals$}"),
                x: if radial { centre[0] } else { xs.apply(pos) },
                y: if radial {
                    ys.apply(pos - xmin) - 5.0
                } else {
                    view_bottom + 18.0
                },
                anchor: if radial { "end" } else { "middle" },
            });
        }

        let divisions = match self.x_measure() {
            DistanceMeasure::NumDate => self.params.minor_ticks_time_tree,
            DistanceMeasure::Div => self.params.minor_ticks,
        };
        let minor_step = step / f64::from(divisions.max(1));
        for ii in 0..=line_count(xmax - grid_min, minor_step, MINOR_OVERSHOOT) {
            let pos = grid_min + minor_step * ii as f64;
            grid.minor.push(GridLine {
                axis: Axis::X,
                value: pos,
                visible: !(pos < min_visible || pos > max_visible + minor_step),
                path: line_at(pos),
            });
        }

        if self.layout == LayoutMode::Clock {
            self.add_divergence_axis(&mut grid, scales);
        }
        Some(grid)
    }

    /// Measure plotted on the x axis. The clock layout always plots dates.
    fn x_measure(&self) -> DistanceMeasure {
        match self.layout {
            LayoutMode::Clock => DistanceMeasure::NumDate,
            _ => self.distance,
        }
    }

    /// Horizontal lines and ticks along the clock layout's divergence axis.
    fn add_divergence_axis(&self, grid: &mut Grid, scales: &Scales) {
        let (xs, ys) = (&scales.x, &scales.y);
        let ymin = ys.domain[0].min(ys.domain[1]);
        let ymax = ys.domain[0].max(ys.domain[1]);
        let span = ymax - ymin;
        if !(span.is_finite() && span > 0.0) {
            return;
        }

        let step = major_step(span);
        let grid_min = (ymin / step).floor() * step;
        let decimals = tick_decimals(step);
        let left = xs.range[0].min(xs.range[1]);
        let right = xs.range[0].max(xs.range[1]);

        for ii in 1..=line_count(ymax - grid_min, step, Y_OVERSHOOT) {
            let pos = grid_min + step * ii as f64;
            let visible = !(pos < ymin || pos > ymax);
            let y = ys.apply(pos);
            grid.major.push(GridLine {
                axis: Axis::Y,
                value: pos,
                visible,
                path: format!("M {left} {y} L {right} {y}"),
            });
            grid.ticks.push(GridTick {
                axis: Axis::Y,
                value: pos,
                visible,
                text: format!("{pos:.decimals$}"),
                x: left - 15.0,
                y,
                anchor: "start",
            });
        }
    }
}

impl Grid {
    /// Ops drawing this grid over the previous one.
    pub fn ops(&self, params: &TreeParams) -> Vec<RenderOp> {
        let mut ops = Vec::new();
        for (target, lines, stroke, width) in [
            (
                ElementClass::MajorGrid,
                &self.major,
                &params.major_grid_stroke,
                params.major_grid_width,
            ),
            (
                ElementClass::MinorGrid,
                &self.minor,
                &params.minor_grid_stroke,
                params.minor_grid_width,
            ),
        ] {
            for (index, line) in lines.iter().enumerate() {
                ops.push(RenderOp::set(
                    target,
                    index,
                    vec![
                        PropertySet::attr("d", line.path.as_str()),
                        PropertySet::style("fill", "none"),
                        PropertySet::visibility(line.visible),
                        PropertySet::style("stroke", stroke.as_str()),
                        PropertySet::style("stroke-width", width),
                    ],
                ));
            }
            ops.push(RenderOp::Truncate {
                target,
                len: lines.len() as u32,
            });
        }

        for (index, tick) in self.ticks.iter().enumerate() {
            ops.push(RenderOp::text(ElementClass::GridTick, index, tick.text.as_str()));
            ops.push(RenderOp::set(
                ElementClass::GridTick,
                index,
                vec![
                    PropertySet::attr("x", tick.x),
                    PropertySet::attr("y", tick.y),
                    PropertySet::visibility(tick.visible),
                    PropertySet::style("font-size", params.tick_label_size),
                    PropertySet::style("fill", params.tick_label_fill.as_str()),
                    PropertySet::style("text-anchor", tick.anchor),
                ],
            ));
        }
        ops.push(RenderOp::Truncate {
            target: ElementClass::GridTick,
            len: self.ticks.len() as u32,
        });
        ops
    }

    /// Ops hiding every grid element.
    pub fn hide_ops() -> Vec<RenderOp> {
        [
            ElementClass::MajorGrid,
            ElementClass::MinorGrid,
            ElementClass::GridTick,
        ]
        .into_iter()
        .map(|target| RenderOp::SetAll {
            target,
            properties: vec![PropertySet::visibility(false)],
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Surface;
    use crate::layout::{apply_layout, set_distance};
    use crate::scale::{LinearScale, ScaleMapper};
    use crate::tree::test_trees;

    fn scales(x_domain: [f64; 2], y_domain: [f64; 2]) -> Scales {
        Scales {
            x: LinearScale::new(x_domain, [25.0, 785.0]),
            y: LinearScale::new(y_domain, [5.0, 575.0]),
        }
    }

    #[test]
    fn test_major_step_refinement() {
        assert_eq!(major_step(10.0), 2.0);
        assert_eq!(major_step(30.0), 5.0);
        assert_eq!(major_step(70.0), 10.0);
        assert!((major_step(0.03) - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_tick_decimals() {
        assert_eq!(tick_decimals(5.0), 0);
        assert_eq!(tick_decimals(0.5), 1);
        assert_eq!(tick_decimals(0.002), 3);
    }

    #[test]
    fn test_rect_grid_visibility() {
        let params = TreeParams::default();
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let grid = GridAnnotator::new(LayoutMode::Rectangular, DistanceMeasure::Div, &params)
            .annotate(&arena, &scales([0.0, 2.0], [0.0, 3.0]))
            .unwrap();

        // span 2 -> step 0.5, lines 0.0..=3.5
        assert_eq!(grid.major.len(), 8);
        let visible = grid.major.iter().filter(|l| l.visible).count();
        assert_eq!(visible, 5);
        assert!(!grid.major.last().unwrap().visible);
        assert_eq!(grid.ticks[2].text, "1.0");
        // four minor lines per major step
        assert!((grid.minor[1].value - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_time_tree_minor_ticks() {
        let params = TreeParams::default();
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let grid = GridAnnotator::new(LayoutMode::Rectangular, DistanceMeasure::NumDate, &params)
            .annotate(&arena, &scales([2000.0, 2004.0], [0.0, 3.0]))
            .unwrap();

        // span 4 -> step 0.5, three minor lines per step
        assert!((grid.minor[1].value - grid.minor[0].value - 0.5 / 3.0).abs() < 1e-9);
        assert_eq!(grid.ticks[0].text, "2000.0");
    }

    #[test]
    fn test_clock_minor_ticks_follow_date_axis() {
        let params = TreeParams::default();
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let grid = GridAnnotator::new(LayoutMode::Clock, DistanceMeasure::Div, &params)
            .annotate(&arena, &scales([2000.0, 2004.0], [2.0, 0.0]))
            .unwrap();

        assert!((grid.minor[1].value - grid.minor[0].value - 0.5 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrooted_and_degenerate_have_no_grid() {
        let params = TreeParams::default();
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let s = scales([0.0, 2.0], [0.0, 3.0]);

        assert!(
            GridAnnotator::new(LayoutMode::Unrooted, DistanceMeasure::Div, &params)
                .annotate(&arena, &s)
                .is_none()
        );
        assert!(
            GridAnnotator::new(LayoutMode::Rectangular, DistanceMeasure::Div, &params)
                .annotate(&arena, &scales([1.0, 1.0], [0.0, 3.0]))
                .is_none()
        );
    }

    #[test]
    fn test_radial_grid_uses_circles() {
        let params = TreeParams::default();
        let mut arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        set_distance(&mut arena, DistanceMeasure::Div).unwrap();
        apply_layout(&mut arena, LayoutMode::Radial).unwrap();
        let s = ScaleMapper::new(LayoutMode::Radial, Surface::default(), &params).fit(&arena);
        let grid = GridAnnotator::new(LayoutMode::Radial, DistanceMeasure::Div, &params)
            .annotate(&arena, &s)
            .unwrap();

        assert!(grid.major.iter().all(|l| l.path.contains(" A ")));
        assert!(grid.major[0].visible);
        assert_eq!(grid.ticks[0].anchor, "end");
    }

    #[test]
    fn test_clock_adds_divergence_axis() {
        let params = TreeParams::default();
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let grid = GridAnnotator::new(LayoutMode::Clock, DistanceMeasure::NumDate, &params)
            .annotate(&arena, &scales([2000.0, 2004.0], [2.0, 0.0]))
            .unwrap();

        let y_lines: Vec<_> = grid.major.iter().filter(|l| l.axis == Axis::Y).collect();
        assert!(!y_lines.is_empty());
        assert!(y_lines.iter().any(|l| l.visible));
        assert!(grid.ticks.iter().any(|t| t.axis == Axis::Y && t.anchor == "start"));
    }

    #[test]
    fn test_ops_truncate_stale_lines() {
        let params = TreeParams::default();
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let grid = GridAnnotator::new(LayoutMode::Rectangular, DistanceMeasure::Div, &params)
            .annotate(&arena, &scales([0.0, 2.0], [0.0, 3.0]))
            .unwrap();
        let ops = grid.ops(&params);

        assert!(ops.contains(&RenderOp::Truncate {
            target: ElementClass::MajorGrid,
            len: grid.major.len() as u32,
        }));
        assert_eq!(Grid::hide_ops().len(), 3);
    }
}
