//! # Scene Engine
//!
//! The transform and render-resource-binding core of a small 3D viewer.
//!
//! ## Features
//!
//! - **Scene Graph**: arena-backed node hierarchy with lazily cached
//!   world transforms
//! - **Asset Loading**: asynchronous, cancellable loading of models,
//!   materials and environment maps on a worker pool
//! - **Animation**: timeline scheduler driving node transforms each tick
//! - **Renderer Seam**: draw submission and scene lighting go through a
//!   pluggable [`render::Renderer`] backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scene_engine::prelude::*;
//! use scene_engine::assets::DirectorySource;
//! use scene_engine::render::RecordingRenderer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SceneSettings::default();
//!     let source = DirectorySource::new(settings.asset_root.clone());
//!     let mut renderer = RecordingRenderer::new();
//!     let mut scene = SceneAssembler::new(settings, Arc::new(source));
//!     scene.assemble(&mut renderer)?;
//!     loop {
//!         scene.advance(1.0 / 60.0, &mut renderer);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod animation;
pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        animation::{AnimationScheduler, RepeatMode, Timeline},
        assets::{AssetError, AssetKind, AssetLoader, AssetSource, CancelToken, LoadedAsset},
        config::{Config, SceneSettings},
        foundation::{
            math::{Mat4, Quat, Transform, Vec3},
            time::Timer,
        },
        render::{DrawableToken, MainLight, Renderer},
        scene::{NodeId, SceneAssembler, SceneError, SceneGraph},
    };
}
