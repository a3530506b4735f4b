//! R-tree based spatial index using the rstar crate.
//!
//! Tips are indexed at their screen position, branches as the segment of
//! their stem from base to tip. Queries are nearest-within-radius in screen
//! pixels.

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::Serialize;

use crate::tree::TreeArena;

/// What a hit target stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Tip,
    Branch,
}

/// A segment in the spatial index with its arena index. Tips are
/// zero-length segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTarget {
    pub index: usize,
    pub kind: HitKind,
    pub from: [f64; 2],
    pub to: [f64; 2],
}

impl HitTarget {
    pub fn tip(index: usize, x: f64, y: f64) -> Self {
        Self {
            index,
            kind: HitKind::Tip,
            from: [x, y],
            to: [x, y],
        }
    }

    pub fn branch(index: usize, from: [f64; 2], to: [f64; 2]) -> Self {
        Self {
            index,
            kind: HitKind::Branch,
            from,
            to,
        }
    }

    fn is_finite(&self) -> bool {
        self.from.iter().chain(&self.to).all(|v| v.is_finite())
    }

    /// Closest point of the segment to `point`.
    fn closest(&self, point: &[f64; 2]) -> [f64; 2] {
        let [x0, y0] = self.from;
        let (dx, dy) = (self.to[0] - x0, self.to[1] - y0);
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return self.from;
        }
        let t = (((point[0] - x0) * dx + (point[1] - y0) * dy) / len_sq).clamp(0.0, 1.0);
        [x0 + t * dx, y0 + t * dy]
    }
}

impl RTreeObject for HitTarget {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.from, self.to)
    }
}

impl PointDistance for HitTarget {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let [cx, cy] = self.closest(point);
        let dx = cx - point[0];
        let dy = cy - point[1];
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.distance_2(point) < f64::EPSILON
    }
}

/// A resolved hit; `index` is the node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Hit {
    pub index: usize,
    pub kind: HitKind,
}

/// Spatial index over the drawn tips and branches.
pub struct SpatialIndex {
    tree: RTree<HitTarget>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load the in-view tips and branches from their screen geometry.
    pub fn rebuild(&mut self, arena: &TreeArena) {
        let root = arena.root();
        let targets: Vec<HitTarget> = arena
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_in_view())
            .flat_map(|(index, node)| {
                let s = &node.screen;
                let tip = node
                    .is_terminal()
                    .then(|| HitTarget::tip(index, s.x_tip, s.y_tip));
                let branch = (index != root).then(|| {
                    HitTarget::branch(index, [s.x_base, s.y_base], [s.x_tip, s.y_tip])
                });
                tip.into_iter().chain(branch)
            })
            .filter(HitTarget::is_finite)
            .collect();

        self.tree = RTree::bulk_load(targets);
    }

    /// Nearest element within `radius` pixels. Tips win over branches at the
    /// same distance.
    pub fn hit(&self, x: f64, y: f64, radius: f64) -> Option<Hit> {
        let radius_sq = radius * radius;
        self.tree
            .locate_within_distance([x, y], radius_sq)
            .min_by(|a, b| {
                a.distance_2(&[x, y])
                    .total_cmp(&b.distance_2(&[x, y]))
                    .then_with(|| (a.kind == HitKind::Branch).cmp(&(b.kind == HitKind::Branch)))
            })
            .map(|p| Hit {
                index: p.index,
                kind: p.kind,
            })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tree.size()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
