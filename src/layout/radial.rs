//! Radial layout: leaf order mapped to angle, distance to radius.

use std::f64::consts::PI;

use crate::tree::{RadialArc, TreeArena};

/// Fraction of the full circle used; leaves a gap so the ends don't meet.
pub const ANGULAR_FILL: f64 = 0.95;

/// Added to the radius when projecting the parent along the ray.
const PROJECTION_EPSILON: f64 = 1e-15;

/// Angle for a leaf-order position.
#[inline]
pub fn angle_of(yvalue: f64, n_tips: usize) -> f64 {
    2.0 * ANGULAR_FILL * PI * yvalue / n_tips.max(1) as f64
}

/// Assign radial coordinates and child arcs from the current depths.
///
/// The parent position is the node's position scaled by the ratio of the
/// parent's radius to its own, i.e. the parent's depth along the node's ray.
pub fn layout(arena: &mut TreeArena) {
    let n_tips = arena.tip_count();
    let offset = arena[arena.root()].depth;

    for node in arena.nodes_mut() {
        let radius = node.depth - offset;
        let parent_radius = node.p_depth - offset;

        node.angle = angle_of(node.yvalue, n_tips);
        node.x = radius * node.angle.sin();
        node.y = radius * node.angle.cos();
        node.px = node.x * parent_radius / (radius + PROJECTION_EPSILON);
        node.py = node.y * parent_radius / (radius + PROJECTION_EPSILON);

        node.arc = if node.is_terminal() {
            None
        } else {
            let start = angle_of(node.y_range[0], n_tips);
            let end = angle_of(node.y_range[1], n_tips);
            Some(RadialArc {
                x_start: radius * start.sin(),
                y_start: radius * start.cos(),
                x_end: radius * end.sin(),
                y_end: radius * end.cos(),
                small_big_arc: (end - start).abs() > PI,
            })
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DistanceMeasure, set_distance};
    use crate::tree::test_trees;

    fn radial(tree: crate::tree::TreeNode) -> TreeArena {
        let mut arena = TreeArena::from_tree(&tree).unwrap();
        set_distance(&mut arena, DistanceMeasure::Div).unwrap();
        layout(&mut arena);
        arena
    }

    #[test]
    fn test_angle_monotonic_in_yvalue() {
        let arena = radial(test_trees::ladder(20));
        let mut nodes: Vec<_> = arena.nodes().iter().collect();
        nodes.sort_by(|a, b| a.yvalue.total_cmp(&b.yvalue));

        for pair in nodes.windows(2) {
            if pair[0].yvalue < pair[1].yvalue {
                assert!(pair[0].angle < pair[1].angle);
            }
        }
        let limit = 2.0 * ANGULAR_FILL * PI;
        assert!(nodes.iter().all(|n| n.angle >= 0.0 && n.angle < limit));
    }

    #[test]
    fn test_sin_cos_projection() {
        let arena = radial(test_trees::balanced_four());
        let t3 = &arena[6];
        let angle = 2.0 * 0.95 * PI * 3.0 / 4.0;

        assert!((t3.x - 2.0 * angle.sin()).abs() < 1e-12);
        assert!((t3.y - 2.0 * angle.cos()).abs() < 1e-12);
        // the parent sits at half the radius on the same ray
        assert!((t3.px - t3.x / 2.0).abs() < 1e-12);
        assert!((t3.py - t3.y / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_length_branch_stays_finite() {
        let arena = radial(test_trees::balanced_four());
        let root = &arena[0];

        assert!(root.px.is_finite() && root.py.is_finite());
        assert_eq!(root.x, 0.0);
        assert_eq!(root.px, 0.0);
    }

    #[test]
    fn test_arc_endpoints_follow_y_range() {
        let arena = radial(test_trees::balanced_four());
        let a = &arena[1];
        let arc = a.arc.unwrap();
        let end = angle_of(1.0, 4);

        assert_eq!(a.y_range, [0.0, 1.0]);
        assert!((arc.x_start - 0.0).abs() < 1e-12);
        assert!((arc.y_start - 1.0).abs() < 1e-12);
        assert!((arc.x_end - end.sin()).abs() < 1e-12);
        assert!(!arc.small_big_arc);
        assert!(arena[2].arc.is_none());
    }

    #[test]
    fn test_wide_arc_flagged() {
        let arena = radial(test_trees::star(10));
        assert!(arena[0].arc.unwrap().small_big_arc);
    }
}
