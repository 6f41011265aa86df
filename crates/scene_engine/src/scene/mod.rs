//! Scene management system
//!
//! The scene layer owns the node hierarchy and everything that feeds it:
//!
//! ```text
//! Asset Loader ──callbacks──▶ Scene Graph ◀──ticks── Animation Driver
//!                                  │
//!                                  ▼ world transforms
//!                               Renderer
//! ```
//!
//! [`SceneGraph`] is the single piece of mutable shared state; asset
//! completion callbacks, animation ticks and draw submission all run on
//! one logical update thread, sequenced by [`SceneAssembler::advance`].

mod assembler;
mod graph;

pub use assembler::{EnvironmentSlots, SceneAssembler};
pub use graph::{NodeId, SceneError, SceneGraph, SceneNode, Traversal};
