//! Per-frame rendering: the [`RenderPipeline`] and the [`RenderPlan`] it
//! produces for the map widget.

mod pipeline;
mod plan;

pub use pipeline::RenderPipeline;
pub use plan::{ExpansionOverlay, RenderPlan};
