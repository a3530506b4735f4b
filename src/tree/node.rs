//! Node identifier, state flags and the per-node wrapper record.
//!
//! Every node of the ingested tree gets exactly one [`PhyloNode`]. It holds:
//! - A stable identifier (its index in the arena)
//! - The data copied out of the input node (name, yvalue, traits)
//! - Parent/children links as arena indices (the root is its own parent)
//! - Layout coordinates for the current layout and distance measure
//! - Screen geometry produced by the last screen mapping
//! - The rendered tip/branch properties used for diffing

use std::collections::HashMap;
use std::fmt;

use super::input::TraitValue;
use crate::render::{BranchPaths, PropertyValue};

/// Stable node identifier.
///
/// Ids are assigned in pre-order during ingestion, so the root is always
/// `NodeId(0)`. They stay valid for the lifetime of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Index into the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Node state flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeState {
    flags: u8,
}

impl NodeState {
    const TERMINAL: u8 = 0b0000_0001;
    const IN_VIEW: u8 = 0b0000_0010;
    const UPDATE: u8 = 0b0000_0100;

    /// Create a new default node state (internal, out of view, clean).
    #[inline]
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    #[inline]
    fn set(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Check if the node is a tip.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self.flags & Self::TERMINAL != 0
    }

    /// Set the terminal state.
    #[inline]
    pub fn set_terminal(&mut self, terminal: bool) {
        self.set(Self::TERMINAL, terminal);
    }

    /// Check if the node is inside the currently viewed clade.
    #[inline]
    pub fn is_in_view(self) -> bool {
        self.flags & Self::IN_VIEW != 0
    }

    /// Set the in-view state.
    #[inline]
    pub fn set_in_view(&mut self, in_view: bool) {
        self.set(Self::IN_VIEW, in_view);
    }

    /// Check if the node must be redrawn in the current pass.
    #[inline]
    pub fn needs_update(self) -> bool {
        self.flags & Self::UPDATE != 0
    }

    /// Set the dirty flag for the current pass.
    #[inline]
    pub fn set_update(&mut self, update: bool) {
        self.set(Self::UPDATE, update);
    }
}

/// Arc connecting the children of an internal node in the radial layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialArc {
    pub x_start: f64,
    pub y_start: f64,
    pub x_end: f64,
    pub y_end: f64,
    /// The arc subtends more than pi; selects the large-arc flag.
    pub small_big_arc: bool,
}

/// Screen-space geometry of a node after the last mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenGeometry {
    pub x_tip: f64,
    pub y_tip: f64,
    pub x_base: f64,
    pub y_base: f64,
    pub branch: BranchPaths,
    /// Confidence interval path, rectangular layout only.
    pub conf_line: Option<String>,
}

/// Decorated tree node.
#[derive(Debug, Clone)]
pub struct PhyloNode {
    pub id: NodeId,
    pub name: String,
    pub yvalue: f64,
    pub attrs: HashMap<String, TraitValue>,

    /// Arena index of the parent. The root points at itself.
    pub parent: usize,
    /// Arena indices of the children in input order. Empty for tips.
    pub children: Vec<usize>,
    pub state: NodeState,
    /// Number of terminal descendants (1 for a tip).
    pub leaf_count: u32,
    /// yvalues of the first and last child (own yvalue twice for tips).
    pub y_range: [f64; 2],

    /// Value of the distance measure for this node and its parent.
    pub depth: f64,
    pub p_depth: f64,
    pub conf: [f64; 2],

    pub x: f64,
    pub y: f64,
    pub px: f64,
    pub py: f64,
    pub angle: f64,
    pub arc: Option<RadialArc>,
    /// Unrooted wedge width and start angle.
    pub w: f64,
    pub tau: f64,
    pub branch_length: f64,

    pub screen: ScreenGeometry,

    pub tip_props: HashMap<String, PropertyValue>,
    pub branch_props: HashMap<String, PropertyValue>,
}

impl PhyloNode {
    pub(crate) fn new(id: NodeId, name: String, yvalue: f64, attrs: HashMap<String, TraitValue>) -> Self {
        Self {
            id,
            name,
            yvalue,
            attrs,
            parent: id.index(),
            children: Vec::new(),
            state: NodeState::new(),
            leaf_count: 1,
            y_range: [yvalue, yvalue],
            depth: 0.0,
            p_depth: 0.0,
            conf: [0.0, 0.0],
            x: 0.0,
            y: 0.0,
            px: 0.0,
            py: 0.0,
            angle: 0.0,
            arc: None,
            w: 0.0,
            tau: 0.0,
            branch_length: 0.0,
            screen: ScreenGeometry::default(),
            tip_props: HashMap::new(),
            branch_props: HashMap::new(),
        }
    }

    /// Check if the node is a tip.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if the node is in view.
    #[inline]
    pub fn is_in_view(&self) -> bool {
        self.state.is_in_view()
    }

    /// Check if the node is flagged for redraw.
    #[inline]
    pub fn needs_update(&self) -> bool {
        self.state.needs_update()
    }

    /// Numeric value of a trait, if present.
    pub fn trait_number(&self, key: &str) -> Option<f64> {
        self.attrs.get(key).and_then(TraitValue::as_number)
    }

    /// Text value of a trait, if present.
    pub fn trait_text(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(TraitValue::as_text)
    }

    /// Confidence interval attached to a trait, either inline or as `<key>_confidence`.
    pub fn trait_confidence(&self, key: &str) -> Option<[f64; 2]> {
        self.attrs
            .get(key)
            .and_then(TraitValue::confidence)
            .or_else(|| {
                self.attrs
                    .get(&format!("{key}_confidence"))
                    .and_then(TraitValue::as_interval)
            })
    }

    /// Stroke width last applied to this node's branch, if any.
    pub fn branch_stroke_width(&self) -> Option<f64> {
        self.branch_props
            .get("stroke-width")
            .and_then(PropertyValue::as_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{}", id), "Node(42)");
    }

    #[test]
    fn test_node_id_conversion() {
        let id: NodeId = 123.into();
        let raw: u32 = id.into();
        assert_eq!(raw, 123);
    }

    #[test]
    fn test_node_state_default() {
        let state = NodeState::new();
        assert!(!state.is_terminal());
        assert!(!state.is_in_view());
        assert!(!state.needs_update());
    }

    #[test]
    fn test_node_state_all_flags() {
        let mut state = NodeState::new();
        state.set_terminal(true);
        state.set_in_view(true);
        state.set_update(true);

        assert!(state.is_terminal());
        assert!(state.is_in_view());
        assert!(state.needs_update());

        state.set_in_view(false);
        assert!(state.is_terminal());
        assert!(!state.is_in_view());
        assert!(state.needs_update());
    }

    #[test]
    fn test_trait_confidence_lookup() {
        let mut attrs = HashMap::new();
        attrs.insert("num_date".to_string(), TraitValue::Number(2015.5));
        attrs.insert(
            "num_date_confidence".to_string(),
            TraitValue::Interval([2015.0, 2016.0]),
        );
        let node = PhyloNode::new(NodeId(0), "root".into(), 0.0, attrs);

        assert_eq!(node.trait_number("num_date"), Some(2015.5));
        assert_eq!(node.trait_confidence("num_date"), Some([2015.0, 2016.0]));
        assert_eq!(node.trait_confidence("div"), None);
    }
}
