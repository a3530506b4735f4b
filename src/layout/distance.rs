//! Distance measure assignment.

use color_eyre::eyre::{Result, eyre};

use super::DistanceMeasure;
use crate::tree::{PhyloNode, TreeArena};

/// Numeric value of `measure` on `node`, validated.
pub(crate) fn measure_value(node: &PhyloNode, measure: DistanceMeasure) -> Result<f64> {
    let key = measure.key();
    let value = node
        .trait_number(key)
        .ok_or_else(|| eyre!("node `{}` has no numeric `{}`", node.name, key))?;
    if !value.is_finite() {
        return Err(eyre!("node `{}` has a non-finite `{}`", node.name, key));
    }
    if measure == DistanceMeasure::Div && value < 0.0 {
        return Err(eyre!("node `{}` has a negative divergence {}", node.name, value));
    }
    Ok(value)
}

/// Set `depth`, `p_depth` and `conf` of every node from `measure` and flag
/// every node for redraw.
///
/// Nothing is written unless every node carries a valid value.
pub fn set_distance(arena: &mut TreeArena, measure: DistanceMeasure) -> Result<()> {
    let depths = arena
        .nodes()
        .iter()
        .map(|node| measure_value(node, measure))
        .collect::<Result<Vec<f64>>>()?;

    for index in 0..arena.len() {
        let parent = arena.parent(index);
        let depth = depths[index];
        let node = &mut arena[index];
        node.depth = depth;
        node.p_depth = depths[parent];
        node.conf = match measure {
            DistanceMeasure::NumDate => node
                .trait_confidence(DistanceMeasure::NumDate.key())
                .unwrap_or([depth, depth]),
            DistanceMeasure::Div => [depth, depth],
        };
    }
    arena.mark_all_updated();

    log::debug!("distance measure set to {}", measure);
    Ok(())
}
