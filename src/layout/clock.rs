//! Clock layout: sampling date against divergence.

use color_eyre::eyre::Result;

use super::DistanceMeasure;
use super::distance::measure_value;
use super::regression::{self, Regression};
use crate::tree::TreeArena;

/// Place every node at `(num_date, div)` with the parent's point as the
/// branch base, and fit the regression through the root.
pub fn layout(arena: &mut TreeArena) -> Result<Regression> {
    let points = arena
        .nodes()
        .iter()
        .map(|n| {
            Ok((
                measure_value(n, DistanceMeasure::NumDate)?,
                measure_value(n, DistanceMeasure::Div)?,
            ))
        })
        .collect::<Result<Vec<(f64, f64)>>>()?;

    for index in 0..arena.len() {
        let parent = arena.parent(index);
        let node = &mut arena[index];
        (node.x, node.y) = points[index];
        (node.px, node.py) = points[parent];
    }

    regression::through_root(arena)
}
