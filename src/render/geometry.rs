//! Op builders for tips, branches and confidence bars.
//!
//! All builders read the screen geometry already stored on the nodes; they
//! never compute positions themselves.

use super::instruction::{ElementClass, PropertySet, RenderOp};
use super::property::{PropertyKind, PropertyValue, TreeElement};
use crate::config::TreeParams;
use crate::tree::{PhyloNode, TreeArena};

/// Width of a confidence bar for a branch of stroke width `width`.
pub fn confidence_width(width: f64) -> f64 {
    if width == 1.0 {
        0.0
    } else if width > 6.0 {
        width + 6.0
    } else {
        width * 2.0
    }
}

fn tip_style(node: &PhyloNode, key: &str, fallback: PropertyValue) -> PropertyValue {
    node.tip_props.get(key).cloned().unwrap_or(fallback)
}

fn branch_style(node: &PhyloNode, key: &str, fallback: PropertyValue) -> PropertyValue {
    node.branch_props.get(key).cloned().unwrap_or(fallback)
}

/// Clear every node-bound element and draw tips and branches from scratch.
pub fn initial_ops(arena: &TreeArena, params: &TreeParams) -> Vec<RenderOp> {
    let mut ops: Vec<RenderOp> = [
        ElementClass::Tip,
        ElementClass::BranchStem,
        ElementClass::BranchBar,
        ElementClass::Confidence,
    ]
    .into_iter()
    .map(|target| RenderOp::Clear { target })
    .collect();

    for node in arena.nodes() {
        let id = node.id.index();
        let stroke = branch_style(node, "stroke", params.branch_stroke.as_str().into());
        let width = branch_style(node, "stroke-width", params.branch_stroke_width.into());
        for target in [ElementClass::BranchStem, ElementClass::BranchBar] {
            ops.push(RenderOp::set(
                target,
                id,
                vec![
                    PropertySet::style("fill", "none"),
                    PropertySet::style("stroke", stroke.clone()),
                    PropertySet::style("stroke-width", width.clone()),
                    PropertySet::style("opacity", 1.0),
                ],
            ));
        }
        if node.is_terminal() {
            ops.push(RenderOp::set(
                ElementClass::Tip,
                id,
                vec![
                    PropertySet::attr("r", tip_style(node, "r", params.tip_radius.into())),
                    PropertySet::style("fill", tip_style(node, "fill", params.tip_fill.as_str().into())),
                    PropertySet::style(
                        "stroke",
                        tip_style(node, "stroke", params.tip_stroke.as_str().into()),
                    ),
                    PropertySet::style(
                        "stroke-width",
                        tip_style(node, "stroke-width", params.tip_stroke_width.into()),
                    ),
                ],
            ));
        }
    }
    ops.extend(tip_position_ops(arena, 0..arena.len()));
    ops.extend(branch_path_ops(arena, 0..arena.len()));
    ops
}

/// Move the tips among `nodes` to their screen positions.
pub fn tip_position_ops(
    arena: &TreeArena,
    nodes: impl IntoIterator<Item = usize>,
) -> Vec<RenderOp> {
    nodes
        .into_iter()
        .map(|index| &arena[index])
        .filter(|node| node.is_terminal())
        .map(|node| {
            RenderOp::set(
                ElementClass::Tip,
                node.id.index(),
                vec![
                    PropertySet::attr("cx", node.screen.x_tip),
                    PropertySet::attr("cy", node.screen.y_tip),
                ],
            )
        })
        .collect()
}

/// Set the stem and bar paths of `nodes`.
pub fn branch_path_ops(
    arena: &TreeArena,
    nodes: impl IntoIterator<Item = usize>,
) -> Vec<RenderOp> {
    let mut ops = Vec::new();
    for index in nodes {
        let node = &arena[index];
        let id = node.id.index();
        ops.push(RenderOp::set(
            ElementClass::BranchStem,
            id,
            vec![PropertySet::attr("d", node.screen.branch.stem.as_str())],
        ));
        ops.push(RenderOp::set(
            ElementClass::BranchBar,
            id,
            vec![PropertySet::attr("d", node.screen.branch.bar.as_str())],
        ));
    }
    ops
}

/// Set the opacity of both branch parts of `nodes`.
pub fn branch_opacity_ops(nodes: &[usize], opacity: f64) -> Vec<RenderOp> {
    nodes
        .iter()
        .flat_map(|&index| {
            [ElementClass::BranchStem, ElementClass::BranchBar]
                .map(|target| RenderOp::set(target, index, vec![PropertySet::style("opacity", opacity)]))
        })
        .collect()
}

/// Redraw every confidence bar from scratch.
pub fn confidence_ops(arena: &TreeArena, params: &TreeParams) -> Vec<RenderOp> {
    let mut ops = vec![RenderOp::Clear {
        target: ElementClass::Confidence,
    }];
    for node in arena.nodes() {
        let Some(path) = &node.screen.conf_line else {
            continue;
        };
        let width = node.branch_stroke_width().unwrap_or(params.branch_stroke_width);
        ops.push(RenderOp::set(
            ElementClass::Confidence,
            node.id.index(),
            vec![
                PropertySet::attr("d", path.as_str()),
                PropertySet::style("stroke", branch_style(node, "stroke", "#888".into())),
                PropertySet::style("opacity", 0.5),
                PropertySet::style("fill", "none"),
                PropertySet::style("stroke-width", confidence_width(width)),
            ],
        ));
    }
    ops
}

/// Re-apply the named stored properties of `nodes` to their elements.
///
/// With `stem_paths`, branch stems also get their recomputed path.
pub fn property_ops(
    arena: &TreeArena,
    element: TreeElement,
    properties: &[(PropertyKind, String)],
    nodes: &[usize],
    stem_paths: bool,
) -> Vec<RenderOp> {
    let mut ops = Vec::new();
    for &index in nodes {
        let node = &arena[index];
        let stored = match element {
            TreeElement::Tips => &node.tip_props,
            TreeElement::Branches => &node.branch_props,
        };
        let sets: Vec<PropertySet> = properties
            .iter()
            .filter_map(|(kind, name)| {
                stored.get(name).map(|value| PropertySet {
                    kind: *kind,
                    name: name.clone(),
                    value: value.clone(),
                })
            })
            .collect();

        match element {
            TreeElement::Tips => {
                if node.is_terminal() {
                    ops.push(RenderOp::set(ElementClass::Tip, index, sets));
                }
            }
            TreeElement::Branches => {
                let mut stem = sets.clone();
                if stem_paths {
                    stem.push(PropertySet::attr("d", node.screen.branch.stem.as_str()));
                }
                ops.push(RenderOp::set(ElementClass::BranchStem, index, stem));
                ops.push(RenderOp::set(ElementClass::BranchBar, index, sets));
            }
        }
    }
    ops
}
