//! PhyloTree - WASM Module
//!
//! Layout and incremental redraw engine for phylogenetic trees, compiled to
//! WebAssembly and exposed to JavaScript via wasm-bindgen.
//!
//! # Architecture
//!
//! - `tree`: node arena built once per dataset, petgraph topology mirror
//! - `layout`: rectangular, radial, unrooted and clock layouts, regression
//! - `scale`: data-to-screen mapping and branch path generation
//! - `visibility`: zoom into clade
//! - `render`: render instructions, property diffing, fade transitions
//! - `grid`: gridlines and tick labels
//! - `spatial`: R-tree hit testing for hover and click
//! - `geo`: Vincenty geodesics for map transmission lines
//! - `phylo_tree`: the engine tying it all together
//!
//! The engine never draws. Every call returns a serialized [`FrameUpdate`]
//! (`{batches, next}`); when `next` is present the host calls
//! `resumeTransition(next.generation)` after `next.delayMs`.
//!
//! [`FrameUpdate`]: render::FrameUpdate

use color_eyre::eyre::Report;
use js_sys::{Function, Reflect};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

pub mod callbacks;
pub mod config;
pub mod geo;
pub mod grid;
pub mod layout;
pub mod logging;
pub mod phylo_tree;
pub mod render;
pub mod scale;
pub mod spatial;
pub mod tree;
pub mod visibility;

use callbacks::{NodeSummary, NoopCallbacks, TreeCallbacks};
use config::{RenderOptions, Surface, TreeParams};
use geo::{LatLng, Vincenty, geodesic_path};
use layout::{DistanceMeasure, LayoutMode};
use phylo_tree::PhyloTree;
use render::{PropertyUpdate, TreeElement};
use tree::{NodeId, PhyloNode, TreeNode};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::install();
}

fn js_error(err: Report) -> JsError {
    JsError::new(&err.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    Ok(serde_wasm_bindgen::to_value(value)?)
}

/// Deserialize an optional JS object, falling back to the default.
fn from_js_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsError> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        Ok(serde_wasm_bindgen::from_value(value)?)
    }
}

/// Host callbacks backed by a plain JS object.
///
/// Missing members fall back to the defaults of [`TreeCallbacks`]. Hooks
/// receive a [`NodeSummary`]; exceptions they throw are logged and ignored.
struct JsCallbacks {
    target: JsValue,
}

impl JsCallbacks {
    fn function(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.target, &JsValue::from_str(name))
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }

    fn call(&self, function: &Function, name: &str, node: &PhyloNode, extra: Option<JsValue>) -> Option<JsValue> {
        let summary = serde_wasm_bindgen::to_value(&NodeSummary::from(node)).ok()?;
        let result = match extra {
            Some(arg) => function.call2(&self.target, &summary, &arg),
            None => function.call1(&self.target, &summary),
        };
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("callback `{name}` threw: {err:?}");
                None
            }
        }
    }

    fn notify(&self, name: &str, node: &PhyloNode) {
        if let Some(function) = self.function(name) {
            self.call(&function, name, node, None);
        }
    }
}

impl TreeCallbacks for JsCallbacks {
    fn on_tip_hover(&self, node: &PhyloNode) {
        self.notify("onTipHover", node);
    }

    fn on_tip_click(&self, node: &PhyloNode) {
        self.notify("onTipClick", node);
    }

    fn on_branch_hover(&self, node: &PhyloNode) {
        self.notify("onBranchHover", node);
    }

    fn on_branch_click(&self, node: &PhyloNode) {
        self.notify("onBranchClick", node);
    }

    fn on_branch_or_tip_leave(&self, node: &PhyloNode) {
        self.notify("onBranchOrTipLeave", node);
    }

    fn branch_label(&self, node: &PhyloNode) -> Option<String> {
        match self.function("branchLabel") {
            Some(function) => self
                .call(&function, "branchLabel", node, None)
                .and_then(|value| value.as_string()),
            None => NoopCallbacks.branch_label(node),
        }
    }

    fn branch_label_size(&self, node: &PhyloNode, n_tips_in_view: usize) -> f64 {
        self.function("branchLabelSize")
            .and_then(|function| {
                self.call(
                    &function,
                    "branchLabelSize",
                    node,
                    Some(JsValue::from_f64(n_tips_in_view as f64)),
                )
            })
            .and_then(|value| value.as_f64())
            .unwrap_or_else(|| NoopCallbacks.branch_label_size(node, n_tips_in_view))
    }

    fn tip_label(&self, node: &PhyloNode) -> String {
        self.function("tipLabel")
            .and_then(|function| self.call(&function, "tipLabel", node, None))
            .and_then(|value| value.as_string())
            .unwrap_or_else(|| NoopCallbacks.tip_label(node))
    }
}

/// Main entry point for the tree engine.
///
/// This struct wraps the internal PhyloTree and provides the public API
/// exposed to JavaScript.
#[wasm_bindgen]
pub struct PhyloTreeWasm {
    tree: PhyloTree,
}

#[wasm_bindgen]
impl PhyloTreeWasm {
    /// Ingest a tree, given either as a JS object or as JSON text.
    #[wasm_bindgen(constructor)]
    pub fn new(tree: JsValue) -> Result<PhyloTreeWasm, JsError> {
        let tree = match tree.as_string() {
            Some(text) => js_sys::JSON::parse(&text)
                .map_err(|_| JsError::new("tree is not valid JSON"))?,
            None => tree,
        };
        let root: TreeNode = serde_wasm_bindgen::from_value(tree)?;
        Ok(Self {
            tree: PhyloTree::new(&root).map_err(js_error)?,
        })
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Initial draw.
    ///
    /// `options` and `params` may be partial objects or undefined. `callbacks`
    /// may carry any of `onTipHover`, `onTipClick`, `onBranchHover`,
    /// `onBranchClick`, `onBranchOrTipLeave`, `branchLabel`,
    /// `branchLabelSize` and `tipLabel`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        width: f64,
        height: f64,
        layout: &str,
        distance: &str,
        options: JsValue,
        params: JsValue,
        callbacks: JsValue,
    ) -> Result<JsValue, JsError> {
        let layout: LayoutMode = layout.parse().map_err(js_error)?;
        let distance: DistanceMeasure = distance.parse().map_err(js_error)?;
        let options: RenderOptions = from_js_or_default(options)?;
        let params: TreeParams = from_js_or_default(params)?;
        let callbacks: Box<dyn TreeCallbacks> = if callbacks.is_object() {
            Box::new(JsCallbacks { target: callbacks })
        } else {
            Box::new(NoopCallbacks)
        };

        let frame = self
            .tree
            .render(
                Surface::new(width, height),
                layout,
                distance,
                options,
                params,
                callbacks,
            )
            .map_err(js_error)?;
        to_js(&frame)
    }

    /// Switch layout with a fade transition over `dt` milliseconds.
    #[wasm_bindgen(js_name = updateLayout)]
    pub fn update_layout(&mut self, layout: &str, dt: f64) -> Result<JsValue, JsError> {
        let layout: LayoutMode = layout.parse().map_err(js_error)?;
        let frame = self.tree.update_layout(layout, dt).map_err(js_error)?;
        to_js(&frame)
    }

    /// Switch the distance measure (`div` or `num_date`).
    #[wasm_bindgen(js_name = updateDistance)]
    pub fn update_distance(&mut self, distance: &str, dt: f64) -> Result<JsValue, JsError> {
        let distance: DistanceMeasure = distance.parse().map_err(js_error)?;
        let frame = self.tree.update_distance(distance, dt).map_err(js_error)?;
        to_js(&frame)
    }

    /// Continue a fade transition. Stale generations return an empty update.
    #[wasm_bindgen(js_name = resumeTransition)]
    pub fn resume_transition(&mut self, generation: u32) -> Result<JsValue, JsError> {
        to_js(&self.tree.resume_transition(generation))
    }

    #[wasm_bindgen(js_name = zoomIntoClade)]
    pub fn zoom_into_clade(&mut self, node_id: u32, dt: f64) -> Result<JsValue, JsError> {
        let frame = self
            .tree
            .zoom_into_clade(NodeId(node_id), dt)
            .map_err(js_error)?;
        to_js(&frame)
    }

    #[wasm_bindgen(js_name = zoomToParent)]
    pub fn zoom_to_parent(&mut self, dt: f64) -> Result<JsValue, JsError> {
        let frame = self.tree.zoom_to_parent(dt).map_err(js_error)?;
        to_js(&frame)
    }

    /// Apply property arrays to `tips` or `branches`.
    ///
    /// `updates` is an array of `{kind: "attribute" | "style", name, values}`
    /// where `values` has one entry per node.
    #[wasm_bindgen(js_name = updateMultipleArray)]
    pub fn update_multiple_array(
        &mut self,
        element: &str,
        updates: JsValue,
        dt: f64,
    ) -> Result<JsValue, JsError> {
        let element: TreeElement = element.parse().map_err(js_error)?;
        let updates: Vec<PropertyUpdate> = serde_wasm_bindgen::from_value(updates)?;
        let frame = self
            .tree
            .update_multiple_array(element, &updates, dt)
            .map_err(js_error)?;
        to_js(&frame)
    }

    #[wasm_bindgen(js_name = showBranchLabels)]
    pub fn show_branch_labels(&mut self) -> Result<JsValue, JsError> {
        to_js(&self.tree.show_branch_labels())
    }

    #[wasm_bindgen(js_name = hideBranchLabels)]
    pub fn hide_branch_labels(&mut self) -> Result<JsValue, JsError> {
        to_js(&self.tree.hide_branch_labels())
    }

    #[wasm_bindgen(js_name = hideGrid)]
    pub fn hide_grid(&mut self) -> Result<JsValue, JsError> {
        to_js(&self.tree.hide_grid())
    }

    // =========================================================================
    // Pointer events
    // =========================================================================

    /// Hover at screen position; returns `{index, kind}` or undefined.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<JsValue, JsError> {
        to_js(&self.tree.pointer_move(x, y))
    }

    #[wasm_bindgen(js_name = pointerClick)]
    pub fn pointer_click(&mut self, x: f64, y: f64) -> Result<JsValue, JsError> {
        to_js(&self.tree.pointer_click(x, y))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Root-to-tip regression `{slope, intercept}`, clock layout only.
    pub fn regression(&self) -> Result<JsValue, JsError> {
        to_js(&self.tree.regression())
    }

    /// Free-intercept fit `{slope, intercept, r2}` over all tips.
    #[wasm_bindgen(js_name = freeRegression)]
    pub fn free_regression(&self) -> Result<JsValue, JsError> {
        to_js(&self.tree.free_regression().map_err(js_error)?)
    }

    /// `intercept = …, slope = …, R^2 = …` text of the free-intercept fit.
    #[wasm_bindgen(js_name = freeRegressionText)]
    pub fn free_regression_text(&self) -> Result<String, JsError> {
        let fit = self.tree.free_regression().map_err(js_error)?;
        Ok(fit.fit_text())
    }

    /// Tip screen positions as `[x0, y0, x1, y1, ...]`, by node id.
    #[wasm_bindgen(js_name = tipPositions)]
    pub fn tip_positions(&self) -> Vec<f32> {
        self.tree.tip_positions()
    }

    /// Branch base screen positions as `[x0, y0, x1, y1, ...]`, by node id.
    #[wasm_bindgen(js_name = basePositions)]
    pub fn base_positions(&self) -> Vec<f32> {
        self.tree.base_positions()
    }

    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.tree.node_count() as u32
    }

    #[wasm_bindgen(js_name = tipCount)]
    pub fn tip_count(&self) -> u32 {
        self.tree.tip_count() as u32
    }

    /// Id of the clade root currently in view.
    #[wasm_bindgen(js_name = zoomNode)]
    pub fn zoom_node(&self) -> u32 {
        self.tree.zoom_node().raw()
    }
}

/// Geodesic between two `{lat, lng}` points sampled in `steps` segments.
///
/// Returns an array of polylines; more than one when the path crosses the
/// antimeridian.
#[wasm_bindgen(js_name = geodesicPath)]
pub fn geodesic_path_js(start: JsValue, end: JsValue, steps: usize) -> Result<JsValue, JsError> {
    let start: LatLng = serde_wasm_bindgen::from_value(start)?;
    let end: LatLng = serde_wasm_bindgen::from_value(end)?;
    let lines = geodesic_path(&Vincenty::wgs84(), start, end, steps).map_err(js_error)?;
    to_js(&lines)
}

#[cfg(test)]
mod integration_tests {
    //! Full pipeline tests without JS types.

    use super::*;
    use crate::render::{ElementClass, PropertyValue, RenderOp};
    use std::f64::consts::PI;

    /// Four tips at yvalue 0..=3 with div 0, 1, 1, 2; one zero-length branch.
    const FOUR_TIPS: &str = r#"{
        "name": "root", "yvalue": 1.5, "node_attrs": {"div": 0, "num_date": 2000.0},
        "children": [
            {"name": "A", "yvalue": 0.5, "node_attrs": {"div": 0, "num_date": 2000.5},
             "children": [
                {"name": "t0", "yvalue": 0, "node_attrs": {"div": 0, "num_date": 2001.0}},
                {"name": "t1", "yvalue": 1, "node_attrs": {"div": 1, "num_date": 2002.0}}
             ]},
            {"strain": "B", "yvalue": 2.5, "attr": {"div": 1, "num_date": {"value": 2001.0, "confidence": [2000.5, 2001.5]}},
             "children": [
                {"name": "t2", "yvalue": 2, "node_attrs": {"div": 1, "num_date": 2003.0}},
                {"name": "t3", "yvalue": 3, "node_attrs": {"div": 2, "num_date": 2004.0}}
             ]}
        ]
    }"#;

    fn four_tips() -> PhyloTree {
        let root: TreeNode = serde_json::from_str(FOUR_TIPS).unwrap();
        let mut tree = PhyloTree::new(&root).unwrap();
        tree.render(
            Surface::new(800.0, 600.0),
            LayoutMode::Rectangular,
            DistanceMeasure::Div,
            RenderOptions::default(),
            TreeParams::default(),
            Box::new(NoopCallbacks),
        )
        .unwrap();
        tree
    }

    fn div_of(name: &str) -> f64 {
        match name {
            "t1" | "B" | "t2" => 1.0,
            "t3" => 2.0,
            _ => 0.0,
        }
    }

    #[test]
    fn test_rect_then_radial_scenario() {
        let mut tree = four_tips();
        for node in tree.arena().nodes() {
            assert_eq!(node.x, div_of(&node.name), "x of {}", node.name);
            assert_eq!(node.y, node.yvalue, "y of {}", node.name);
        }
        let y_ranges: Vec<_> = tree.arena().nodes().iter().map(|n| n.y_range).collect();

        tree.update_layout(LayoutMode::Radial, 0.0).unwrap();
        for (node, y_range) in tree.arena().nodes().iter().zip(&y_ranges) {
            assert_eq!(node.y_range, *y_range);
            let angle = 2.0 * 0.95 * PI * node.yvalue / 4.0;
            let radius = div_of(&node.name);
            assert!((node.x - radius * angle.sin()).abs() < 1e-12);
            assert!((node.y - radius * angle.cos()).abs() < 1e-12);
            assert!(node.px.is_finite() && node.py.is_finite());
        }
    }

    #[test]
    fn test_radial_scales_are_square() {
        let mut tree = four_tips();
        tree.update_layout(LayoutMode::Radial, 0.0).unwrap();

        let scales = tree.scales();
        assert!((scales.x.range_span().abs() - scales.y.range_span().abs()).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_then_fade_session() {
        let mut tree = four_tips();

        tree.zoom_into_clade(NodeId(4), 300.0).unwrap();
        let in_view: Vec<_> = tree
            .arena()
            .nodes()
            .iter()
            .filter(|n| n.is_in_view())
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(in_view, ["B", "t2", "t3"]);

        let first = tree.update_layout(LayoutMode::Unrooted, 1000.0).unwrap();
        let second = tree.update_layout(LayoutMode::Rectangular, 1000.0).unwrap();
        assert!(tree.resume_transition(first.next.unwrap().generation).is_empty());

        let mut step = second.next;
        let mut phases = 0;
        while let Some(next) = step {
            step = tree.resume_transition(next.generation).next;
            phases += 1;
        }
        assert_eq!(phases, 3);
    }

    #[test]
    fn test_diff_minimality_on_hundred_nodes() {
        let children: Vec<String> = (0..99)
            .map(|i| format!(r#"{{"name": "t{i}", "yvalue": {i}, "node_attrs": {{"div": 1}}}}"#))
            .collect();
        let json = format!(
            r#"{{"name": "root", "yvalue": 49, "node_attrs": {{"div": 0}}, "children": [{}]}}"#,
            children.join(",")
        );
        let root: TreeNode = serde_json::from_str(&json).unwrap();
        let mut tree = PhyloTree::new(&root).unwrap();
        tree.render(
            Surface::new(800.0, 600.0),
            LayoutMode::Rectangular,
            DistanceMeasure::Div,
            RenderOptions::default(),
            TreeParams::default(),
            Box::new(NoopCallbacks),
        )
        .unwrap();

        let colours = |changed: usize| -> Vec<PropertyValue> {
            (0..100)
                .map(|i| PropertyValue::from(if i == changed { "#F00" } else { "#CCC" }))
                .collect()
        };
        let updates: Vec<PropertyUpdate> = serde_json::from_value(serde_json::json!([
            {"kind": "style", "name": "fill", "values": colours(usize::MAX)}
        ]))
        .unwrap();
        tree.update_multiple_array(TreeElement::Tips, &updates, 0.0)
            .unwrap();

        let frame = tree
            .update_multiple_array(
                TreeElement::Tips,
                &[PropertyUpdate::style("fill", colours(42))],
                0.0,
            )
            .unwrap();
        assert_eq!(tree.arena().updated(), vec![42]);
        let ops: Vec<_> = frame.ops().collect();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            ops[0],
            RenderOp::Set {
                target: ElementClass::Tip,
                index: 42,
                ..
            }
        ));
    }

    #[test]
    fn test_confidence_from_measured_trait() {
        let mut tree = four_tips();
        tree.update_distance(DistanceMeasure::NumDate, 0.0).unwrap();

        let b = &tree.arena()[4];
        assert_eq!(b.depth, 2001.0);
        assert_eq!(b.conf, [2000.5, 2001.5]);
        assert_eq!(tree.arena()[5].conf, [2003.0, 2003.0]);
    }

    #[test]
    fn test_frame_serializes_for_host() {
        let mut tree = four_tips();
        let frame = tree.update_layout(LayoutMode::Clock, 400.0).unwrap();
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["next"]["delayMs"], 200.0);
        assert_eq!(json["batches"][0]["ops"][0]["op"], "set");
        assert_eq!(json["batches"][1]["durationMs"], 400.0);
    }

    #[test]
    fn test_missing_trait_fails_fast() {
        let root: TreeNode = serde_json::from_str(
            r#"{"name": "root", "yvalue": 0.5, "node_attrs": {"div": 0},
                "children": [{"name": "a", "yvalue": 0}, {"name": "b", "yvalue": 1, "node_attrs": {"div": 1}}]}"#,
        )
        .unwrap();
        let mut tree = PhyloTree::new(&root).unwrap();
        let result = tree.render(
            Surface::new(800.0, 600.0),
            LayoutMode::Rectangular,
            DistanceMeasure::Div,
            RenderOptions::default(),
            TreeParams::default(),
            Box::new(NoopCallbacks),
        );
        assert!(result.is_err());
    }
}
