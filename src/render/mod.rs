//! Render instruction model and incremental redraw.
//!
//! - `property`: typed tip/branch property updates and the value diff
//! - `instruction`: ops, timed batches and frame updates handed to the host
//! - `transition`: generation-tokened fade state machine
//! - `geometry`, `labels`: op builders over the stored screen geometry
//! - `paths`: SVG path strings

pub mod geometry;
pub mod instruction;
pub mod labels;
pub mod paths;
pub mod property;
pub mod transition;

pub use instruction::{ElementClass, FrameUpdate, PropertySet, RenderBatch, RenderOp, ScheduledStep};
pub use paths::BranchPaths;
pub use property::{
    DiffOutcome, PropertyKind, PropertyUpdate, PropertyValue, TreeElement, apply_property_updates,
};
pub use transition::{TransitionMachine, TransitionPhase, TransitionStep};
