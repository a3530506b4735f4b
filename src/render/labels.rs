//! Branch and tip label ops.

use super::instruction::{ElementClass, PropertySet, RenderOp};
use crate::callbacks::TreeCallbacks;
use crate::config::TreeParams;
use crate::layout::LayoutMode;
use crate::tree::TreeArena;

/// Nodes that carry a non-empty branch label, with the label text.
fn labelled<'a>(
    arena: &'a TreeArena,
    callbacks: &'a dyn TreeCallbacks,
) -> impl Iterator<Item = (usize, String)> + 'a {
    arena.nodes().iter().filter_map(move |node| {
        callbacks
            .branch_label(node)
            .filter(|text| !text.is_empty())
            .map(|text| (node.id.index(), text))
    })
}

/// Create the branch label elements with their text.
pub fn branch_label_text_ops(arena: &TreeArena, callbacks: &dyn TreeCallbacks) -> Vec<RenderOp> {
    let mut ops = vec![RenderOp::Clear {
        target: ElementClass::BranchLabel,
    }];
    ops.extend(
        labelled(arena, callbacks)
            .map(|(index, text)| RenderOp::text(ElementClass::BranchLabel, index, text)),
    );
    ops
}

/// Position, size and visibility of every branch label.
///
/// Labels are only shown in the rectangular layout, and only while enabled.
pub fn branch_label_ops(
    arena: &TreeArena,
    callbacks: &dyn TreeCallbacks,
    params: &TreeParams,
    layout: LayoutMode,
    show: bool,
) -> Vec<RenderOp> {
    let visible = show && layout == LayoutMode::Rectangular;
    let n_tips_in_view = arena.tips_in_view();
    labelled(arena, callbacks)
        .map(|(index, _)| {
            let node = &arena[index];
            let size = callbacks.branch_label_size(node, n_tips_in_view);
            RenderOp::set(
                ElementClass::BranchLabel,
                index,
                vec![
                    PropertySet::attr("x", node.screen.x_tip - params.branch_label_pad_x),
                    PropertySet::attr("y", node.screen.y_tip - params.branch_label_pad_y),
                    PropertySet::visibility(visible),
                    PropertySet::style("fill", params.branch_label_fill.as_str()),
                    PropertySet::style("font-size", format!("{size}px")),
                    PropertySet::style("text-anchor", "end"),
                ],
            )
        })
        .collect()
}

/// Show or hide every branch label.
pub fn branch_label_visibility(visible: bool) -> RenderOp {
    RenderOp::SetAll {
        target: ElementClass::BranchLabel,
        properties: vec![PropertySet::visibility(visible)],
    }
}

/// Redraw tip labels: only drawn when few enough tips are in view.
pub fn tip_label_ops(
    arena: &TreeArena,
    callbacks: &dyn TreeCallbacks,
    params: &TreeParams,
) -> Vec<RenderOp> {
    let mut ops = vec![RenderOp::Clear {
        target: ElementClass::TipLabel,
    }];
    if arena.tips_in_view() >= params.tip_label_threshold {
        return ops;
    }
    for node in arena
        .nodes()
        .iter()
        .filter(|n| n.is_terminal() && n.is_in_view())
    {
        let index = node.id.index();
        ops.push(RenderOp::text(ElementClass::TipLabel, index, callbacks.tip_label(node)));
        ops.push(RenderOp::set(
            ElementClass::TipLabel,
            index,
            vec![
                PropertySet::attr("x", node.screen.x_tip + params.tip_label_pad_x),
                PropertySet::attr("y", node.screen.y_tip + params.tip_label_pad_y),
                PropertySet::visibility(true),
            ],
        ));
    }
    ops
}

/// Fade every label element to `opacity`.
pub fn label_opacity_ops(opacity: f64) -> Vec<RenderOp> {
    [ElementClass::BranchLabel, ElementClass::TipLabel]
        .into_iter()
        .map(|target| RenderOp::SetAll {
            target,
            properties: vec![PropertySet::style("opacity", opacity)],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::NoopCallbacks;
    use crate::callbacks::recording::RecordingCallbacks;
    use crate::render::PropertyValue;
    use crate::tree::test_trees;

    #[test]
    fn test_tip_labels_below_threshold() {
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let ops = tip_label_ops(&arena, &NoopCallbacks, &TreeParams::default());

        let texts: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::SetText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, ["t0", "t1", "t2", "t3"]);
    }

    #[test]
    fn test_tip_labels_suppressed_above_threshold() {
        let arena = TreeArena::from_tree(&test_trees::star(60)).unwrap();
        let ops = tip_label_ops(&arena, &NoopCallbacks, &TreeParams::default());

        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], RenderOp::Clear { .. }));
    }

    #[test]
    fn test_branch_labels_hidden_outside_rect() {
        let arena = TreeArena::from_tree(&test_trees::balanced_four()).unwrap();
        let callbacks = RecordingCallbacks::default();
        let params = TreeParams::default();

        let rect = branch_label_ops(&arena, &callbacks, &params, LayoutMode::Rectangular, true);
        let radial = branch_label_ops(&arena, &callbacks, &params, LayoutMode::Radial, true);

        // root, A and B are labelled
        assert_eq!(rect.len(), 3);
        let visibility = |ops: &[RenderOp]| match &ops[0] {
            RenderOp::Set { properties, .. } => properties[2].value.clone(),
            _ => unreachable!(),
        };
        assert_eq!(visibility(&rect), PropertyValue::from("visible"));
        assert_eq!(visibility(&radial), PropertyValue::from("hidden"));
    }
}
