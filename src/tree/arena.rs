//! TreeArena - flat storage of the ingested tree.
//!
//! Every input node becomes one [`PhyloNode`] in a `Vec`, indexed in
//! pre-order, with parent/children links stored as indices. A petgraph
//! `Graph` mirrors the parent→child edges and is used for the traversals
//! (clade membership, post-order leaf counting).

use color_eyre::eyre::{Result, eyre};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::{Dfs, DfsPostOrder};
use petgraph::Directed;

use super::input::TreeNode;
use super::node::{NodeId, PhyloNode};

/// The arena holding every node of one dataset.
pub struct TreeArena {
    /// Topology mirror. Node weights are the stable ids, indices match the arena.
    graph: Graph<NodeId, (), Directed>,

    /// Node records, index 0 is the root.
    nodes: Vec<PhyloNode>,

    /// Number of terminal nodes.
    tip_count: usize,
}

impl TreeArena {
    /// Ingest a nested tree.
    ///
    /// Fails on non-finite or duplicated tip `yvalue`s; everything downstream
    /// assumes a well-formed leaf ordering.
    pub fn from_tree(root: &TreeNode) -> Result<Self> {
        let mut graph: Graph<NodeId, (), Directed> = Graph::new();
        let mut nodes: Vec<PhyloNode> = Vec::new();

        // Pre-order walk with an explicit stack; children are pushed in
        // reverse so they pop in input order.
        let mut stack: Vec<(&TreeNode, Option<usize>)> = vec![(root, None)];
        while let Some((input, parent)) = stack.pop() {
            if !input.yvalue.is_finite() {
                return Err(eyre!("node `{}` has a non-finite yvalue", input.name));
            }

            let index = nodes.len();
            let id = NodeId(index as u32);
            let graph_index = graph.add_node(id);
            debug_assert_eq!(graph_index.index(), index);

            let mut node = PhyloNode::new(
                id,
                input.name.clone(),
                input.yvalue,
                input.node_attrs.clone(),
            );
            node.state.set_terminal(input.children.is_empty());
            node.state.set_in_view(true);

            if let Some(parent) = parent {
                node.parent = parent;
                nodes[parent].children.push(index);
                graph.add_edge(NodeIndex::new(parent), graph_index, ());
            }
            nodes.push(node);

            for child in input.children.iter().rev() {
                stack.push((child, Some(index)));
            }
        }

        let mut tip_yvalues: Vec<f64> = nodes
            .iter()
            .filter(|n| n.is_terminal())
            .map(|n| n.yvalue)
            .collect();
        tip_yvalues.sort_by(f64::total_cmp);
        if tip_yvalues.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(eyre!("tip yvalues must be unique"));
        }

        for index in 0..nodes.len() {
            if let (Some(&first), Some(&last)) =
                (nodes[index].children.first(), nodes[index].children.last())
            {
                nodes[index].y_range = [nodes[first].yvalue, nodes[last].yvalue];
            }
        }

        let mut arena = Self {
            graph,
            tip_count: tip_yvalues.len(),
            nodes,
        };
        arena.recompute_leaf_counts();

        log::debug!(
            "ingested tree with {} nodes and {} tips",
            arena.len(),
            arena.tip_count
        );
        Ok(arena)
    }

    /// Index of the root node.
    #[inline]
    pub fn root(&self) -> usize {
        0
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The arena always holds at least the root; provided for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of terminal nodes.
    #[inline]
    pub fn tip_count(&self) -> usize {
        self.tip_count
    }

    /// Get a node by arena index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&PhyloNode> {
        self.nodes.get(index)
    }

    /// Resolve a stable id to an arena index.
    pub fn index_of(&self, id: NodeId) -> Result<usize> {
        if id.index() < self.nodes.len() {
            Ok(id.index())
        } else {
            Err(eyre!("unknown node {id}"))
        }
    }

    /// Find a node by name.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// All nodes in pre-order.
    #[inline]
    pub fn nodes(&self) -> &[PhyloNode] {
        &self.nodes
    }

    /// Mutable access to all nodes.
    #[inline]
    pub fn nodes_mut(&mut self) -> &mut [PhyloNode] {
        &mut self.nodes
    }

    /// Arena index of a node's parent (the root returns itself).
    #[inline]
    pub fn parent(&self, index: usize) -> usize {
        self.nodes[index].parent
    }

    /// The clade rooted at `index`, in depth-first order starting with `index`.
    pub fn clade(&self, index: usize) -> Vec<usize> {
        let mut dfs = Dfs::new(&self.graph, NodeIndex::new(index));
        let mut members = Vec::new();
        while let Some(nx) = dfs.next(&self.graph) {
            members.push(nx.index());
        }
        members
    }

    /// Recompute `leaf_count` bottom-up for every node.
    pub fn recompute_leaf_counts(&mut self) {
        let mut postorder = DfsPostOrder::new(&self.graph, NodeIndex::new(self.root()));
        while let Some(nx) = postorder.next(&self.graph) {
            let index = nx.index();
            let count = if self.nodes[index].is_terminal() {
                1
            } else {
                self.nodes[index]
                    .children
                    .iter()
                    .map(|&c| self.nodes[c].leaf_count)
                    .sum()
            };
            self.nodes[index].leaf_count = count;
        }
    }

    /// Clear every dirty flag; called at the start of each diff pass.
    pub fn reset_updates(&mut self) {
        for node in &mut self.nodes {
            node.state.set_update(false);
        }
    }

    /// Flag every node for redraw.
    pub fn mark_all_updated(&mut self) {
        for node in &mut self.nodes {
            node.state.set_update(true);
        }
    }

    /// Indices of nodes flagged for redraw.
    pub fn updated(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.needs_update())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of terminal nodes currently in view.
    pub fn tips_in_view(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.is_terminal() && n.is_in_view())
            .count()
    }
}

impl std::ops::Index<usize> for TreeArena {
    type Output = PhyloNode;

    fn index(&self, index: usize) -> &PhyloNode {
        &self.nodes[index]
    }
}

impl std::ops::IndexMut<usize> for TreeArena {
    fn index_mut(&mut self, index: usize) -> &mut PhyloNode {
        &mut self.nodes[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_trees;

    #[test]
    fn test_ingest_preorder() {
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();

        assert_eq!(arena.len(), 7);
        assert_eq!(arena.tip_count(), 4);
        let names: Vec<_> = arena.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["root", "A", "t0", "t1", "B", "t2", "t3"]);
    }

    #[test]
    fn test_root_is_own_parent() {
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();

        assert_eq!(arena.parent(arena.root()), arena.root());
        for node in arena.nodes().iter().skip(1) {
            assert!(arena[node.parent].children.contains(&node.id.index()));
        }
    }

    #[test]
    fn test_leaf_count_invariant() {
        let arena = TreeArena::from_tree(&test_trees::ladder(9)).unwrap();

        let tips = arena.nodes().iter().filter(|n| n.is_terminal()).count();
        assert_eq!(arena[arena.root()].leaf_count as usize, tips);
        for node in arena.nodes() {
            if node.is_terminal() {
                assert_eq!(node.leaf_count, 1);
            } else {
                let sum: u32 = node.children.iter().map(|&c| arena[c].leaf_count).sum();
                assert_eq!(node.leaf_count, sum);
            }
        }
    }

    #[test]
    fn test_y_range_from_first_and_last_child() {
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();

        assert_eq!(arena[0].y_range, [0.5, 2.5]);
        assert_eq!(arena[1].y_range, [0.0, 1.0]);
        assert_eq!(arena[2].y_range, [0.0, 0.0]);
    }

    #[test]
    fn test_clade_members() {
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();

        let mut clade = arena.clade(4);
        clade.sort_unstable();
        assert_eq!(clade, vec![4, 5, 6]);
        assert_eq!(arena.clade(0).len(), 7);
    }

    #[test]
    fn test_duplicate_tip_yvalues_rejected() {
        let tree = TreeNode::new("root", 0.5)
            .with_children(vec![TreeNode::new("a", 1.0), TreeNode::new("b", 1.0)]);

        assert!(TreeArena::from_tree(&tree).is_err());
    }

    #[test]
    fn test_non_finite_yvalue_rejected() {
        let tree = TreeNode::new("root", f64::NAN);
        assert!(TreeArena::from_tree(&tree).is_err());
    }

    #[test]
    fn test_index_of_unknown_node() {
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        assert!(arena.index_of(NodeId(7)).is_err());
        assert_eq!(arena.index_of(NodeId(3)).unwrap(), 3);
    }
}
