//! Host hooks invoked by the engine.

use serde::Serialize;

use crate::tree::PhyloNode;

/// Hover/click handlers and label providers supplied by the host.
///
/// Every method has a default, so implementors only override what they use.
pub trait TreeCallbacks {
    fn on_tip_hover(&self, _node: &PhyloNode) {}

    fn on_tip_click(&self, _node: &PhyloNode) {}

    fn on_branch_hover(&self, _node: &PhyloNode) {}

    fn on_branch_click(&self, _node: &PhyloNode) {}

    fn on_branch_or_tip_leave(&self, _node: &PhyloNode) {}

    /// Text drawn on a branch. Defaults to the `clade_name` trait.
    fn branch_label(&self, node: &PhyloNode) -> Option<String> {
        node.trait_text("clade_name").map(str::to_string)
    }

    /// Font size in pixels of a branch label.
    fn branch_label_size(&self, _node: &PhyloNode, _n_tips_in_view: usize) -> f64 {
        12.0
    }

    /// Text drawn next to a tip.
    fn tip_label(&self, node: &PhyloNode) -> String {
        node.name.clone()
    }
}

/// Callbacks that keep every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl TreeCallbacks for NoopCallbacks {}

/// Node view handed to host callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub id: u32,
    pub name: String,
    pub terminal: bool,
    pub in_view: bool,
    pub leaf_count: u32,
    pub depth: f64,
    pub x_tip: f64,
    pub y_tip: f64,
}

impl From<&PhyloNode> for NodeSummary {
    fn from(node: &PhyloNode) -> Self {
        Self {
            id: node.id.raw(),
            name: node.name.clone(),
            terminal: node.is_terminal(),
            in_view: node.is_in_view(),
            leaf_count: node.leaf_count,
            depth: node.depth,
            x_tip: node.screen.x_tip,
            y_tip: node.screen.y_tip,
        }
    }
}
