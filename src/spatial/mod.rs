//! Spatial indexing for O(log n) hit testing.
//!
//! This module provides an R-tree based spatial index over the screen
//! positions of tips and branches, used to resolve pointer events.

mod rtree;

pub use rtree::{Hit, HitKind, HitTarget, SpatialIndex};
