//! Cluster expansion: spreading a tapped cluster's members around it.
//!
//! # State Machine
//!
//! ```text
//!          expand            finished            contract           finished
//!   Idle ─────────▶ Expanding ─────────▶ Expanded ─────────▶ Contracting ─────────▶ Idle
//!    ▲                                      │
//!    └──────── clusters recomputed ─────────┘   (cluster id gone, any phase)
//! ```
//!
//! Only one cluster is expanded at a time. Expanding a different cluster
//! while one is `Expanded` contracts the first instantly. Requests made
//! while an animation is in flight are rejected.

mod machine;
mod state;

pub use machine::ClusterExpansionMachine;
pub use state::{
    circle_positions, ExpandedMember, ExpansionConfig, ExpansionEvent, ExpansionPhase,
    ExpansionState, DEFAULT_ANIMATION_DURATION, DEFAULT_EXPANSION_RADIUS_DEG,
};
