//! Render instructions handed to the host.
//!
//! The engine never touches the drawing surface. Every entry point returns a
//! [`FrameUpdate`]: a list of timed batches of [`RenderOp`]s and, while a
//! multi-phase transition is running, the step the host must schedule next.

use serde::Serialize;

use super::property::{PropertyKind, PropertyValue};

/// Class of drawn element an op addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementClass {
    Tip,
    BranchStem,
    BranchBar,
    Confidence,
    BranchLabel,
    TipLabel,
    MajorGrid,
    MinorGrid,
    GridTick,
    Regression,
    RegressionLabel,
}

/// One attribute or style assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySet {
    pub kind: PropertyKind,
    pub name: String,
    pub value: PropertyValue,
}

impl PropertySet {
    pub fn attr(name: &str, value: impl Into<PropertyValue>) -> Self {
        Self {
            kind: PropertyKind::Attribute,
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn style(name: &str, value: impl Into<PropertyValue>) -> Self {
        Self {
            kind: PropertyKind::Style,
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn visibility(visible: bool) -> Self {
        Self::style("visibility", if visible { "visible" } else { "hidden" })
    }
}

/// A single drawing instruction.
///
/// For node-bound classes `index` is the node id; for grid and label classes
/// it is the position in the emitted sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RenderOp {
    /// Assign properties to one element, creating it if needed.
    Set {
        target: ElementClass,
        index: u32,
        properties: Vec<PropertySet>,
    },
    /// Set the text content of one element.
    SetText {
        target: ElementClass,
        index: u32,
        text: String,
    },
    /// Assign properties to every element of a class.
    SetAll {
        target: ElementClass,
        properties: Vec<PropertySet>,
    },
    /// Remove every element of a class.
    Clear { target: ElementClass },
    /// Remove elements with index >= `len`.
    Truncate { target: ElementClass, len: u32 },
}

impl RenderOp {
    pub fn set(target: ElementClass, index: usize, properties: Vec<PropertySet>) -> Self {
        RenderOp::Set {
            target,
            index: index as u32,
            properties,
        }
    }

    pub fn text(target: ElementClass, index: usize, text: impl Into<String>) -> Self {
        RenderOp::SetText {
            target,
            index: index as u32,
            text: text.into(),
        }
    }

    pub fn target(&self) -> ElementClass {
        match self {
            RenderOp::Set { target, .. }
            | RenderOp::SetText { target, .. }
            | RenderOp::SetAll { target, .. }
            | RenderOp::Clear { target }
            | RenderOp::Truncate { target, .. } => *target,
        }
    }
}

/// Ops applied together, starting after `delay_ms` and animated over `duration_ms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderBatch {
    pub delay_ms: f64,
    pub duration_ms: f64,
    pub ops: Vec<RenderOp>,
}

impl RenderBatch {
    pub fn new(delay_ms: f64, duration_ms: f64) -> Self {
        Self {
            delay_ms,
            duration_ms,
            ops: Vec::new(),
        }
    }

    /// A batch applied immediately without animation.
    pub fn immediate() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn with_ops(mut self, ops: Vec<RenderOp>) -> Self {
        self.ops = ops;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Continuation the host must schedule: call `resumeTransition(generation)`
/// after `delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledStep {
    pub delay_ms: f64,
    pub generation: u32,
}

/// Output of one engine entry point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameUpdate {
    pub batches: Vec<RenderBatch>,
    pub next: Option<ScheduledStep>,
}

impl FrameUpdate {
    /// Append a batch, dropping it if it has no ops.
    pub fn push(&mut self, batch: RenderBatch) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }

    /// Every op across all batches, in order.
    pub fn ops(&self) -> impl Iterator<Item = &RenderOp> {
        self.batches.iter().flat_map(|b| b.ops.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.next.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_serializes_with_tag() {
        let op = RenderOp::set(
            ElementClass::BranchStem,
            3,
            vec![PropertySet::attr("d", "M 0,0 L 1,1")],
        );
        let json = serde_json::to_value(&op).unwrap();

        assert_eq!(json["op"], "set");
        assert_eq!(json["target"], "branchStem");
        assert_eq!(json["index"], 3);
        assert_eq!(json["properties"][0]["kind"], "attribute");
        assert_eq!(json["properties"][0]["value"], "M 0,0 L 1,1");
    }

    #[test]
    fn test_empty_batches_dropped() {
        let mut frame = FrameUpdate::default();
        frame.push(RenderBatch::immediate());
        frame.push(RenderBatch::new(0.0, 500.0).with_ops(vec![RenderOp::Clear {
            target: ElementClass::Confidence,
        }]));

        assert_eq!(frame.batches.len(), 1);
        assert_eq!(frame.ops().count(), 1);
    }

    #[test]
    fn test_frame_serializes_camel_case() {
        let frame = FrameUpdate {
            batches: vec![],
            next: Some(ScheduledStep {
                delay_ms: 250.0,
                generation: 4,
            }),
        };
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["next"]["delayMs"], 250.0);
        assert_eq!(json["next"]["generation"], 4);
    }
}
