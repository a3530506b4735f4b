//! Rectangular layout: distance on x, leaf order on y.

use crate::tree::TreeArena;

/// Assign rectangular coordinates from the current depths.
///
/// Branches are elbows, so the parent projection keeps the node's own y.
pub fn layout(arena: &mut TreeArena) {
    for node in arena.nodes_mut() {
        node.y = node.yvalue;
        node.x = node.depth;
        node.px = node.p_depth;
        node.py = node.y;
    }
}
