//! Tree data structures.
//!
//! The input tree is flattened once per dataset into a [`TreeArena`]: one
//! [`PhyloNode`] wrapper per input node, linked by integer indices, with the
//! root as its own parent.

mod arena;
mod input;
mod node;

pub use arena::TreeArena;
pub use input::{TraitValue, TreeNode};
pub use node::{NodeId, NodeState, PhyloNode, RadialArc, ScreenGeometry};
