//! Zoom into clade: which nodes are in view.

use crate::tree::TreeArena;

/// Put exactly the clade rooted at `target` in view.
///
/// A tip is redirected to its parent, since a single leaf is not a useful
/// view. Every node whose in-view flag changes is flagged for redraw.
/// Returns the index of the clade root actually used.
pub fn zoom_into_clade(arena: &mut TreeArena, target: usize) -> usize {
    let clade_root = if arena[target].is_terminal() {
        let parent = arena.parent(target);
        log::debug!(
            "zoom target `{}` is a tip, using parent `{}`",
            arena[target].name,
            arena[parent].name
        );
        parent
    } else {
        target
    };

    let mut in_view = vec![false; arena.len()];
    for member in arena.clade(clade_root) {
        in_view[member] = true;
    }

    let mut changed = 0;
    for (node, &visible) in arena.nodes_mut().iter_mut().zip(&in_view) {
        if node.is_in_view() != visible {
            node.state.set_in_view(visible);
            node.state.set_update(true);
            changed += 1;
        }
    }

    log::debug!(
        "zoomed into `{}`: {} nodes changed visibility",
        arena[clade_root].name,
        changed
    );
    clade_root
}
