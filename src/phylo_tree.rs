//! PhyloTree - layout state and incremental redraw for one dataset.
//!
//! Owns the node arena and everything derived from it: the current layout
//! and distance measure, the fitted scales, the regression, the zoom clade,
//! the running transition and the hit-test index. Every mutation entry point
//! returns a [`FrameUpdate`] for the host to apply.

use color_eyre::eyre::{Result, eyre};

use crate::callbacks::{NoopCallbacks, TreeCallbacks};
use crate::config::{RenderOptions, Surface, TreeParams};
use crate::grid::{Grid, GridAnnotator};
use crate::layout::regression::free_intercept;
use crate::layout::{DistanceMeasure, LayoutMode, Regression, apply_layout, set_distance};
use crate::render::{
    ElementClass, FrameUpdate, PropertySet, PropertyUpdate, RenderBatch, RenderOp, ScheduledStep,
    TransitionMachine, TransitionStep, TreeElement, apply_property_updates, geometry, labels,
    paths,
};
use crate::scale::{ScaleMapper, Scales};
use crate::spatial::{Hit, HitKind, SpatialIndex};
use crate::tree::{NodeId, TreeArena, TreeNode};
use crate::visibility;

/// Offset of the rate label from the end of the regression line.
const REGRESSION_LABEL_OFFSET: [f64; 2] = [-10.0, -10.0];

/// Tree layout and redraw engine.
pub struct PhyloTree {
    arena: TreeArena,
    layout: LayoutMode,
    distance: DistanceMeasure,
    params: TreeParams,
    options: RenderOptions,
    surface: Surface,
    scales: Scales,
    regression: Option<Regression>,
    /// Root of the clade currently in view.
    zoom_node: usize,
    transitions: TransitionMachine,
    hits: SpatialIndex,
    callbacks: Box<dyn TreeCallbacks>,
    hovered: Option<Hit>,
    rendered: bool,
}

impl PhyloTree {
    /// Ingest a tree. Nothing is laid out until [`render`](Self::render).
    pub fn new(root: &TreeNode) -> Result<Self> {
        let arena = TreeArena::from_tree(root)?;
        let zoom_node = arena.root();
        Ok(Self {
            arena,
            layout: LayoutMode::Rectangular,
            distance: DistanceMeasure::Div,
            params: TreeParams::default(),
            options: RenderOptions::default(),
            surface: Surface::default(),
            scales: Scales::default(),
            regression: None,
            zoom_node,
            transitions: TransitionMachine::new(),
            hits: SpatialIndex::new(),
            callbacks: Box::new(NoopCallbacks),
            hovered: None,
            rendered: false,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn arena(&self) -> &TreeArena {
        &self.arena
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn distance(&self) -> DistanceMeasure {
        self.distance
    }

    pub fn scales(&self) -> &Scales {
        &self.scales
    }

    /// Root of the clade in view.
    pub fn zoom_node(&self) -> NodeId {
        self.arena[self.zoom_node].id
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn tip_count(&self) -> usize {
        self.arena.tip_count()
    }

    /// Root-to-tip regression, present in the clock layout.
    pub fn regression(&self) -> Option<Regression> {
        self.regression
    }

    /// Free-intercept least squares over all tips, with `r²`.
    pub fn free_regression(&self) -> Result<Regression> {
        free_intercept(&self.arena)
    }

    /// Interleaved `[x0, y0, x1, y1, ...]` tip screen positions, by node id.
    pub fn tip_positions(&self) -> Vec<f32> {
        self.arena
            .nodes()
            .iter()
            .flat_map(|n| [n.screen.x_tip as f32, n.screen.y_tip as f32])
            .collect()
    }

    /// Interleaved branch base screen positions, by node id.
    pub fn base_positions(&self) -> Vec<f32> {
        self.arena
            .nodes()
            .iter()
            .flat_map(|n| [n.screen.x_base as f32, n.screen.y_base as f32])
            .collect()
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Initial draw. Lays out the whole tree and emits every element.
    pub fn render(
        &mut self,
        surface: Surface,
        layout: LayoutMode,
        distance: DistanceMeasure,
        options: RenderOptions,
        params: TreeParams,
        callbacks: Box<dyn TreeCallbacks>,
    ) -> Result<FrameUpdate> {
        if !(surface.width > 0.0 && surface.height > 0.0) {
            return Err(eyre!(
                "surface must have a positive size, got {}x{}",
                surface.width,
                surface.height
            ));
        }
        set_distance(&mut self.arena, distance)?;
        let regression = apply_layout(&mut self.arena, layout)?;

        self.transitions.begin_plain();
        self.surface = surface;
        self.layout = layout;
        self.distance = distance;
        self.options = options;
        self.params = params;
        self.callbacks = callbacks;
        self.regression = regression;
        self.hovered = None;
        self.remap();
        self.rendered = true;
        log::debug!(
            "render {} layout, distance {}, {}x{}",
            layout,
            distance,
            surface.width,
            surface.height
        );

        let mut ops = geometry::initial_ops(&self.arena, &self.params);
        ops.extend(self.confidence_ops());
        ops.extend(self.grid_ops());
        ops.extend(self.regression_ops());
        if self.options.branch_labels {
            ops.extend(labels::branch_label_text_ops(&self.arena, self.callbacks.as_ref()));
            ops.extend(self.branch_label_ops());
        } else {
            ops.push(RenderOp::Clear {
                target: ElementClass::BranchLabel,
            });
        }
        ops.extend(labels::tip_label_ops(&self.arena, self.callbacks.as_ref(), &self.params));

        let mut frame = FrameUpdate::default();
        frame.push(RenderBatch::immediate().with_ops(ops));
        self.arena.reset_updates();
        Ok(frame)
    }

    /// Switch layout with a fade: tips move over `dt` while branches fade
    /// out, swap paths at `0.5 * dt` and fade back in.
    pub fn update_layout(&mut self, layout: LayoutMode, dt: f64) -> Result<FrameUpdate> {
        self.ensure_rendered()?;
        if layout == self.layout {
            return Ok(FrameUpdate::default());
        }
        self.arena.reset_updates();
        let regression = apply_layout(&mut self.arena, layout)?;
        log::debug!("layout {} -> {}", self.layout, layout);
        self.layout = layout;
        self.regression = regression;
        self.arena.mark_all_updated();
        self.remap();

        let updated = self.arena.updated();
        let generation = self.transitions.begin_fade(updated.clone(), dt);

        let mut fade_out = geometry::branch_opacity_ops(self.transitions.nodes(), 0.0);
        fade_out.extend(labels::label_opacity_ops(0.0));
        fade_out.push(RenderOp::Clear {
            target: ElementClass::Confidence,
        });

        let mut moves = geometry::tip_position_ops(&self.arena, updated);
        moves.extend(self.grid_ops());
        moves.extend(self.regression_ops());

        let mut frame = FrameUpdate::default();
        frame.push(RenderBatch::new(0.0, 0.5 * dt).with_ops(fade_out));
        frame.push(RenderBatch::new(0.0, dt).with_ops(moves));
        frame.push(RenderBatch::new(dt, 0.0).with_ops(labels::tip_label_ops(
            &self.arena,
            self.callbacks.as_ref(),
            &self.params,
        )));
        frame.next = self.scheduled(generation);
        Ok(frame)
    }

    /// Advance the running fade. Stale generations produce an empty update.
    pub fn resume_transition(&mut self, generation: u32) -> FrameUpdate {
        let mut frame = FrameUpdate::default();
        let Some(step) = self.transitions.resume(generation) else {
            return frame;
        };
        match step {
            TransitionStep::Settle => {}
            TransitionStep::Swap { nodes } => {
                let mut ops = geometry::branch_path_ops(&self.arena, nodes);
                ops.extend(self.confidence_ops());
                ops.extend(self.branch_label_ops());
                frame.push(RenderBatch::immediate().with_ops(ops));
            }
            TransitionStep::FadeIn { nodes, duration_ms } => {
                let mut ops = geometry::branch_opacity_ops(&nodes, 1.0);
                ops.extend(labels::label_opacity_ops(1.0));
                frame.push(RenderBatch::new(0.0, duration_ms).with_ops(ops));
            }
        }
        frame.next = self.scheduled(generation);
        frame
    }

    /// Change the distance measure; tips and branches move together over `dt`.
    pub fn update_distance(&mut self, distance: DistanceMeasure, dt: f64) -> Result<FrameUpdate> {
        self.ensure_rendered()?;
        self.arena.reset_updates();
        set_distance(&mut self.arena, distance)?;
        self.regression = apply_layout(&mut self.arena, self.layout)?;
        log::debug!("distance {} -> {}", self.distance, distance);
        self.distance = distance;
        let orphans = self.transitions.begin_plain();
        self.remap();
        Ok(self.geometry_frame(&orphans, dt))
    }

    /// Put the clade of `node` in view and rescale. Tips zoom into their parent.
    pub fn zoom_into_clade(&mut self, node: NodeId, dt: f64) -> Result<FrameUpdate> {
        self.ensure_rendered()?;
        let index = self.arena.index_of(node)?;
        self.arena.reset_updates();
        self.zoom_node = visibility::zoom_into_clade(&mut self.arena, index);
        let orphans = self.transitions.begin_plain();
        self.remap();
        Ok(self.geometry_frame(&orphans, dt))
    }

    /// Zoom out to the parent of the clade in view.
    pub fn zoom_to_parent(&mut self, dt: f64) -> Result<FrameUpdate> {
        let parent = self.arena.parent(self.zoom_node);
        self.zoom_into_clade(self.arena[parent].id, dt)
    }

    /// Apply parallel property arrays to tips or branches and redraw only the
    /// nodes whose values changed.
    ///
    /// A changed branch stroke width moves the stems of the node and its
    /// children, so their paths are recomputed and redrawn too.
    pub fn update_multiple_array(
        &mut self,
        element: TreeElement,
        updates: &[PropertyUpdate],
        dt: f64,
    ) -> Result<FrameUpdate> {
        self.ensure_rendered()?;
        let outcome = apply_property_updates(&mut self.arena, element, updates)?;
        if outcome.stroke_width_changed {
            self.remap();
        }

        let properties: Vec<_> = updates.iter().map(|u| (u.kind, u.name.clone())).collect();
        let nodes = self.arena.updated();
        let mut ops = geometry::property_ops(
            &self.arena,
            element,
            &properties,
            &nodes,
            outcome.stroke_width_changed,
        );
        if outcome.stroke_width_changed && self.confidence_enabled() {
            ops.extend(geometry::confidence_ops(&self.arena, &self.params));
        }

        let mut frame = FrameUpdate::default();
        frame.push(RenderBatch::new(0.0, dt).with_ops(ops));
        Ok(frame)
    }

    pub fn show_branch_labels(&mut self) -> FrameUpdate {
        self.set_branch_label_visibility(true)
    }

    pub fn hide_branch_labels(&mut self) -> FrameUpdate {
        self.set_branch_label_visibility(false)
    }

    /// Hide every gridline and tick. The grid stays hidden on later updates.
    pub fn hide_grid(&mut self) -> FrameUpdate {
        self.options.grid = false;
        let mut frame = FrameUpdate::default();
        frame.push(RenderBatch::immediate().with_ops(Grid::hide_ops()));
        frame
    }

    /// Resolve a pointer position and fire hover/leave callbacks when the
    /// hovered element changes.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<Hit> {
        let hit = self.hits.hit(x, y, self.params.hit_radius);
        if hit == self.hovered {
            return hit;
        }
        if let Some(previous) = self.hovered {
            self.callbacks
                .on_branch_or_tip_leave(&self.arena[previous.index]);
        }
        if let Some(current) = hit {
            let node = &self.arena[current.index];
            match current.kind {
                HitKind::Tip => self.callbacks.on_tip_hover(node),
                HitKind::Branch => self.callbacks.on_branch_hover(node),
            }
        }
        self.hovered = hit;
        hit
    }

    /// Resolve a click and fire the matching click callback.
    pub fn pointer_click(&mut self, x: f64, y: f64) -> Option<Hit> {
        let hit = self.hits.hit(x, y, self.params.hit_radius)?;
        let node = &self.arena[hit.index];
        match hit.kind {
            HitKind::Tip => self.callbacks.on_tip_click(node),
            HitKind::Branch => self.callbacks.on_branch_click(node),
        }
        Some(hit)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_rendered(&self) -> Result<()> {
        if self.rendered {
            Ok(())
        } else {
            Err(eyre!("tree has not been rendered yet"))
        }
    }

    fn confidence_enabled(&self) -> bool {
        self.options.confidence && self.layout == LayoutMode::Rectangular
    }

    /// Refit the scales, map every node to the screen and rebuild the hit index.
    fn remap(&mut self) {
        let mapper = ScaleMapper::new(self.layout, self.surface, &self.params);
        self.scales = mapper.fit(&self.arena);
        let confidence = self.confidence_enabled();
        let changed = mapper.map_to_screen(&mut self.arena, &self.scales, confidence);
        self.hits.rebuild(&self.arena);
        log::debug!("screen geometry changed on {changed} nodes");
    }

    fn scheduled(&self, generation: u32) -> Option<ScheduledStep> {
        self.transitions
            .next_delay()
            .map(|delay_ms| ScheduledStep {
                delay_ms,
                generation,
            })
    }

    /// Plain transition: every flagged node, plus branches left half-faded by
    /// a cancelled fade, moves straight to its new geometry over `dt`.
    fn geometry_frame(&self, orphans: &[usize], dt: f64) -> FrameUpdate {
        let mut redraw = self.arena.updated();
        redraw.extend_from_slice(orphans);
        redraw.sort_unstable();
        redraw.dedup();

        let mut frame = FrameUpdate::default();
        if !orphans.is_empty() {
            let mut restore = geometry::branch_opacity_ops(orphans, 1.0);
            restore.extend(labels::label_opacity_ops(1.0));
            frame.push(RenderBatch::immediate().with_ops(restore));
        }

        let mut ops = geometry::tip_position_ops(&self.arena, redraw.iter().copied());
        ops.extend(geometry::branch_path_ops(&self.arena, redraw.iter().copied()));
        ops.extend(self.confidence_ops());
        ops.extend(self.grid_ops());
        ops.extend(self.regression_ops());
        ops.extend(self.branch_label_ops());
        frame.push(RenderBatch::new(0.0, dt).with_ops(ops));
        frame.push(RenderBatch::new(dt, 0.0).with_ops(labels::tip_label_ops(
            &self.arena,
            self.callbacks.as_ref(),
            &self.params,
        )));
        frame
    }

    fn confidence_ops(&self) -> Vec<RenderOp> {
        if self.confidence_enabled() {
            geometry::confidence_ops(&self.arena, &self.params)
        } else {
            vec![RenderOp::Clear {
                target: ElementClass::Confidence,
            }]
        }
    }

    fn grid_ops(&self) -> Vec<RenderOp> {
        if !self.options.grid {
            return Grid::hide_ops();
        }
        GridAnnotator::new(self.layout, self.distance, &self.params)
            .annotate(&self.arena, &self.scales)
            .map(|grid| grid.ops(&self.params))
            .unwrap_or_else(Grid::hide_ops)
    }

    fn branch_label_ops(&self) -> Vec<RenderOp> {
        if !self.options.branch_labels {
            return Vec::new();
        }
        labels::branch_label_ops(
            &self.arena,
            self.callbacks.as_ref(),
            &self.params,
            self.layout,
            self.options.show_branch_labels,
        )
    }

    /// Regression line and rate label, drawn in the clock layout on a
    /// calendar axis only.
    fn regression_ops(&self) -> Vec<RenderOp> {
        let regression = match self.regression {
            Some(r) if self.layout == LayoutMode::Clock && self.distance == DistanceMeasure::NumDate => r,
            _ => {
                return vec![
                    RenderOp::Clear {
                        target: ElementClass::Regression,
                    },
                    RenderOp::Clear {
                        target: ElementClass::RegressionLabel,
                    },
                ];
            }
        };

        let (xs, ys) = (&self.scales.x, &self.scales.y);
        let [x0, x1] = xs.domain;
        let start = [xs.apply(x0), ys.apply(regression.at(x0))];
        let end = [xs.apply(x1), ys.apply(regression.at(x1))];
        vec![
            RenderOp::set(
                ElementClass::Regression,
                0,
                vec![
                    PropertySet::attr("d", paths::line(start, end)),
                    PropertySet::style("fill", "none"),
                    PropertySet::style("stroke", self.params.regression_stroke.as_str()),
                    PropertySet::style("stroke-width", self.params.regression_width),
                    PropertySet::visibility(true),
                ],
            ),
            RenderOp::text(
                ElementClass::RegressionLabel,
                0,
                regression.rate_text(ys.domain[0].max(ys.domain[1])),
            ),
            RenderOp::set(
                ElementClass::RegressionLabel,
                0,
                vec![
                    PropertySet::attr("x", end[0] + REGRESSION_LABEL_OFFSET[0]),
                    PropertySet::attr("y", end[1] + REGRESSION_LABEL_OFFSET[1]),
                    PropertySet::style("fill", self.params.regression_stroke.as_str()),
                    PropertySet::style("font-size", self.params.tick_label_size),
                    PropertySet::style("text-anchor", "end"),
                    PropertySet::visibility(true),
                ],
            ),
        ]
    }

    fn set_branch_label_visibility(&mut self, show: bool) -> FrameUpdate {
        self.options.show_branch_labels = show;
        let mut frame = FrameUpdate::default();
        if self.options.branch_labels {
            let visible = show && self.layout == LayoutMode::Rectangular;
            frame.push(RenderBatch::immediate().with_ops(vec![labels::branch_label_visibility(visible)]));
        }
        frame
    }
}
