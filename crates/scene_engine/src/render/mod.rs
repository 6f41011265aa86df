//! Renderer seam
//!
//! The scene core never talks to a GPU. Everything graphics-related goes
//! through the [`Renderer`] trait: binding loaded resources into drawable
//! tokens, per-frame draw submission, and scene-level environment and
//! lighting setup. Backends own all pipeline, shader and format concerns.

use crate::assets::LoadedAsset;
use crate::foundation::math::{Transform, Vec3};

/// Opaque token identifying a bound, drawable resource
///
/// Minted by [`Renderer::bind`]; the core only stores and passes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableToken(pub u64);

/// Shadow mapping bias parameters for the main light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowBias {
    /// Constant depth bias applied during shadow sampling
    pub constant_bias: f32,

    /// Shadow blur kernel width
    pub blur_width: f32,
}

/// Description of the scene's single directional light
#[derive(Debug, Clone, PartialEq)]
pub struct MainLight {
    /// Light direction (from the light toward the scene)
    pub direction: Vec3,

    /// Linear RGB color
    pub color: Vec3,

    /// Intensity in lux
    pub intensity: f32,

    /// Shadow configuration; `None` disables shadow casting
    pub shadow: Option<ShadowBias>,
}

impl Default for MainLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, 0.0),
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 100_000.0,
            shadow: Some(ShadowBias {
                constant_bias: 0.05,
                blur_width: 3.0,
            }),
        }
    }
}

/// Rendering backend collaborator
///
/// All methods are called from the scene's single update thread.
pub trait Renderer {
    /// Bind a loaded resource, producing a drawable token
    ///
    /// Called once when a node acquires a mesh or material handle.
    fn bind(&mut self, asset: &LoadedAsset) -> DrawableToken;

    /// Submit one drawable for this frame with its resolved world transform
    fn submit(&mut self, world: &Transform, drawable: DrawableToken, casts_shadows: bool);

    /// Configure scene-wide environment (skybox + indirect light)
    ///
    /// Called once at assembly time, after both environment maps loaded.
    fn set_environment(&mut self, skybox: &LoadedAsset, indirect_light: &LoadedAsset);

    /// Configure the main directional light
    fn set_main_light(&mut self, light: &MainLight);
}

/// One recorded draw submission
#[derive(Debug, Clone)]
pub struct Submission {
    /// Resolved world transform at submission time
    pub world: Transform,

    /// Token being drawn
    pub drawable: DrawableToken,

    /// Shadow-casting flag of the submitting node
    pub casts_shadows: bool,
}

/// Headless renderer that records every call it receives
///
/// Backend used by tests and terminal demos: binds mint sequential tokens
/// and submissions accumulate per frame for inspection.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next_token: u64,

    /// Paths of every bound asset, in bind order
    pub bound: Vec<String>,

    /// Submissions recorded since the last [`Self::clear_frame`]
    pub submissions: Vec<Submission>,

    /// Environment map paths, once both arrived
    pub environment: Option<(String, String)>,

    /// Last configured main light
    pub main_light: Option<MainLight>,
}

impl RecordingRenderer {
    /// Create a new recording renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget recorded submissions, keeping bindings and scene state
    pub fn clear_frame(&mut self) {
        self.submissions.clear();
    }

    /// Find the submissions for a given drawable token
    pub fn submissions_for(&self, drawable: DrawableToken) -> Vec<&Submission> {
        self.submissions
            .iter()
            .filter(|s| s.drawable == drawable)
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn bind(&mut self, asset: &LoadedAsset) -> DrawableToken {
        let token = DrawableToken(self.next_token);
        self.next_token += 1;
        self.bound.push(asset.path.clone());
        log::debug!("bound {:?} asset '{}' as {:?}", asset.kind, asset.path, token);
        token
    }

    fn submit(&mut self, world: &Transform, drawable: DrawableToken, casts_shadows: bool) {
        self.submissions.push(Submission {
            world: world.clone(),
            drawable,
            casts_shadows,
        });
    }

    fn set_environment(&mut self, skybox: &LoadedAsset, indirect_light: &LoadedAsset) {
        self.environment = Some((skybox.path.clone(), indirect_light.path.clone()));
    }

    fn set_main_light(&mut self, light: &MainLight) {
        self.main_light = Some(light.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetKind;

    fn asset(path: &str) -> LoadedAsset {
        LoadedAsset::new(AssetKind::Material, path, vec![1, 2, 3])
    }

    #[test]
    fn test_bind_mints_unique_tokens() {
        let mut renderer = RecordingRenderer::new();
        let a = renderer.bind(&asset("a.filamat"));
        let b = renderer.bind(&asset("b.filamat"));
        assert_ne!(a, b);
        assert_eq!(renderer.bound, vec!["a.filamat", "b.filamat"]);
    }

    #[test]
    fn test_clear_frame_keeps_scene_state() {
        let mut renderer = RecordingRenderer::new();
        let token = renderer.bind(&asset("a.filamat"));
        renderer.submit(&Transform::identity(), token, true);
        renderer.set_main_light(&MainLight::default());

        renderer.clear_frame();
        assert!(renderer.submissions.is_empty());
        assert!(renderer.main_light.is_some());
        assert_eq!(renderer.bound.len(), 1);
    }
}
