//! Unrooted layout using the equal-angle algorithm.
//!
//! Every node owns an angular wedge proportional to its leaf count. Children
//! split their parent's wedge contiguously and each child sits at its
//! parent's position plus its branch length along the bisector of its own
//! wedge.

use std::f64::consts::PI;

use crate::tree::TreeArena;

/// Start angle of the root's first child.
const ROOT_START_ANGLE: f64 = 1.5 * PI;

pub fn layout(arena: &mut TreeArena) {
    arena.recompute_leaf_counts();
    let root = arena.root();
    let n_tips = f64::from(arena[root].leaf_count.max(1));

    for node in arena.nodes_mut() {
        node.branch_length = node.depth - node.p_depth;
    }

    {
        let node = &mut arena[root];
        node.x = 0.0;
        node.y = 0.0;
        node.px = 0.0;
        node.py = 0.0;
        node.w = 2.0 * PI;
        node.tau = 0.0;
    }

    // Pre-order: a node's wedge and parent position are known before it is placed.
    let mut stack: Vec<(usize, f64)> = vec![(root, ROOT_START_ANGLE)];
    while let Some((parent, start)) = stack.pop() {
        let (origin_x, origin_y) = (arena[parent].x, arena[parent].y);
        let children = arena[parent].children.clone();

        let mut eta = start;
        for child in children {
            let node = &mut arena[child];
            node.w = 2.0 * PI * f64::from(node.leaf_count) / n_tips;
            node.tau = eta;
            eta += node.w;

            let bisector = node.tau + 0.5 * node.w;
            node.px = origin_x;
            node.py = origin_y;
            node.x = origin_x + node.branch_length * bisector.cos();
            node.y = origin_y + node.branch_length * bisector.sin();

            if !node.is_terminal() {
                let tau = node.tau;
                stack.push((child, tau));
            }
        }
    }
}
