//! Typed tip/branch property updates and the value-diff pass.

use std::fmt;
use std::str::FromStr;

use color_eyre::eyre::{Report, Result, eyre};
use serde::{Deserialize, Serialize};

use crate::tree::TreeArena;

/// Which drawn element a property update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeElement {
    #[serde(alias = "tip", alias = ".tip")]
    Tips,
    #[serde(alias = "branch", alias = ".branch")]
    Branches,
}

impl FromStr for TreeElement {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tips" | "tip" | ".tip" => Ok(TreeElement::Tips),
            "branches" | "branch" | ".branch" => Ok(TreeElement::Branches),
            other => Err(eyre!("unknown tree element `{other}`")),
        }
    }
}

/// Whether a property is an element attribute or a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    #[serde(alias = "attr")]
    Attribute,
    Style,
}

/// A rendered property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(value) => Some(*value),
            PropertyValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            PropertyValue::Number(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(value) => write!(f, "{value}"),
            PropertyValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// New values of one property for every node, indexed like the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub kind: PropertyKind,
    pub name: String,
    pub values: Vec<PropertyValue>,
}

impl PropertyUpdate {
    pub fn attribute(name: impl Into<String>, values: Vec<PropertyValue>) -> Self {
        Self {
            kind: PropertyKind::Attribute,
            name: name.into(),
            values,
        }
    }

    pub fn style(name: impl Into<String>, values: Vec<PropertyValue>) -> Self {
        Self {
            kind: PropertyKind::Style,
            name: name.into(),
            values,
        }
    }
}

/// Result of a diff pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Number of (node, property) pairs whose value changed.
    pub changed_values: usize,
    /// Number of nodes flagged for redraw.
    pub changed_nodes: usize,
    /// A branch stroke width changed, so branch paths must be recomputed.
    pub stroke_width_changed: bool,
}

/// Store the new values and flag every node with at least one changed value.
///
/// All arrays are checked against the node count before anything is written.
/// Update flags are cleared first, so afterwards exactly the changed nodes
/// are flagged.
pub fn apply_property_updates(
    arena: &mut TreeArena,
    element: TreeElement,
    updates: &[PropertyUpdate],
) -> Result<DiffOutcome> {
    let n_nodes = arena.len();
    if let Some(bad) = updates.iter().find(|u| u.values.len() != n_nodes) {
        return Err(eyre!(
            "property `{}` has {} values for {} nodes",
            bad.name,
            bad.values.len(),
            n_nodes
        ));
    }

    arena.reset_updates();
    let mut outcome = DiffOutcome::default();
    for (index, node) in arena.nodes_mut().iter_mut().enumerate() {
        let mut node_changed = false;
        for update in updates {
            let value = &update.values[index];
            let stored = match element {
                TreeElement::Tips => &mut node.tip_props,
                TreeElement::Branches => &mut node.branch_props,
            };
            if stored.get(&update.name) == Some(value) {
                continue;
            }
            stored.insert(update.name.clone(), value.clone());
            node_changed = true;
            outcome.changed_values += 1;
            if element == TreeElement::Branches && update.name == "stroke-width" {
                outcome.stroke_width_changed = true;
            }
        }
        if node_changed {
            node.state.set_update(true);
            outcome.changed_nodes += 1;
        }
    }

    log::debug!(
        "{:?} diff: {} values changed on {} nodes",
        element,
        outcome.changed_values,
        outcome.changed_nodes
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_trees;

    fn fills(n: usize, colour: &str) -> Vec<PropertyValue> {
        (0..n).map(|_| PropertyValue::from(colour)).collect()
    }

    #[test]
    fn test_single_change_flags_single_node() {
        let mut arena = TreeArena::from_tree(&test_trees::star(99)).unwrap();
        assert_eq!(arena.len(), 100);

        let first = PropertyUpdate::style("fill", fills(100, "#CCC"));
        apply_property_updates(&mut arena, TreeElement::Tips, &[first]).unwrap();
        assert_eq!(arena.updated().len(), 100);

        let mut values = fills(100, "#CCC");
        values[42] = "#F00".into();
        let second = PropertyUpdate::style("fill", values);
        let outcome = apply_property_updates(&mut arena, TreeElement::Tips, &[second]).unwrap();

        assert_eq!(arena.updated(), vec![42]);
        assert_eq!(outcome.changed_nodes, 1);
        assert_eq!(outcome.changed_values, 1);
        assert!(!outcome.stroke_width_changed);
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let mut arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let radii = || vec![PropertyValue::Number(4.0); 7];

        apply_property_updates(
            &mut arena,
            TreeElement::Tips,
            &[PropertyUpdate::attribute("r", radii())],
        )
        .unwrap();
        let outcome = apply_property_updates(
            &mut arena,
            TreeElement::Tips,
            &[PropertyUpdate::attribute("r", radii())],
        )
        .unwrap();

        assert_eq!(outcome.changed_nodes, 0);
        assert!(arena.updated().is_empty());
    }

    #[test]
    fn test_length_mismatch_leaves_state_untouched() {
        let mut arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let update = PropertyUpdate::style("stroke", fills(3, "#000"));

        assert!(apply_property_updates(&mut arena, TreeElement::Branches, &[update]).is_err());
        assert!(arena.nodes().iter().all(|n| n.branch_props.is_empty()));
    }

    #[test]
    fn test_branch_stroke_width_reported() {
        let mut arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let widths = vec![PropertyValue::Number(3.0); 7];
        let outcome = apply_property_updates(
            &mut arena,
            TreeElement::Branches,
            &[PropertyUpdate::style("stroke-width", widths)],
        )
        .unwrap();

        assert!(outcome.stroke_width_changed);
        assert_eq!(arena[1].branch_stroke_width(), Some(3.0));
        assert!(arena[1].tip_props.is_empty());
    }

    #[test]
    fn test_element_aliases() {
        let element: TreeElement = serde_json::from_str(r#"".branch""#).unwrap();
        assert_eq!(element, TreeElement::Branches);
        let update: PropertyUpdate =
            serde_json::from_str(r##"{"kind": "style", "name": "fill", "values": ["#000", 2]}"##)
                .unwrap();
        assert_eq!(update.values[1], PropertyValue::Number(2.0));
        assert_eq!(".tip".parse::<TreeElement>().unwrap(), TreeElement::Tips);
        assert!("node".parse::<TreeElement>().is_err());
    }
}
