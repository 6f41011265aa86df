//! Cockroach demo scene
//!
//! Headless rendition of the original showcase: skybox and indirect
//! light, a metallic cube with an animated reverse-loop transform, a
//! glass child cube, an asynchronously loaded cockroach model, and a
//! shadow-casting directional light. Draw traffic goes to a renderer
//! backend that logs instead of rasterizing.

use std::sync::Arc;

use scene_engine::assets::{DirectorySource, LoadedAsset};
use scene_engine::config::Config;
use scene_engine::foundation::math::Transform;
use scene_engine::prelude::*;

/// Renderer backend that logs every call instead of drawing
#[derive(Default)]
struct LogRenderer {
    next_token: u64,
    frame_submissions: usize,
}

impl Renderer for LogRenderer {
    fn bind(&mut self, asset: &LoadedAsset) -> DrawableToken {
        let token = DrawableToken(self.next_token);
        self.next_token += 1;
        log::info!(
            "bound {:?} '{}' ({} bytes) as {:?}",
            asset.kind,
            asset.path,
            asset.bytes.len(),
            token
        );
        token
    }

    fn submit(&mut self, world: &Transform, drawable: DrawableToken, casts_shadows: bool) {
        self.frame_submissions += 1;
        log::trace!(
            "submit {:?} at ({:.3}, {:.3}, {:.3}) shadows={}",
            drawable,
            world.position.x,
            world.position.y,
            world.position.z,
            casts_shadows
        );
    }

    fn set_environment(&mut self, skybox: &LoadedAsset, indirect_light: &LoadedAsset) {
        log::info!(
            "environment: skybox '{}', indirect light '{}'",
            skybox.path,
            indirect_light.path
        );
    }

    fn set_main_light(&mut self, light: &MainLight) {
        log::info!(
            "main light: direction {:?}, intensity {}, shadows={}",
            light.direction,
            light.intensity,
            light.shadow.is_some()
        );
    }
}

fn load_settings() -> SceneSettings {
    match std::env::args().nth(1) {
        Some(path) => match SceneSettings::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("could not load settings from '{path}': {e}");
                std::process::exit(1);
            }
        },
        None => SceneSettings {
            asset_root: "cockroach_app/assets".to_string(),
            ..SceneSettings::default()
        },
    }
}

fn main() {
    env_logger::init();

    let settings = load_settings();
    let source = DirectorySource::new(settings.asset_root.clone());
    let mut renderer = LogRenderer::default();
    let mut scene = SceneAssembler::new(settings, Arc::new(source));

    if let Err(e) = scene.assemble(&mut renderer) {
        log::error!("scene assembly failed: {e}");
        std::process::exit(1);
    }

    // ~5 seconds of simulated frames: two and a half reverse loops
    let mut timer = Timer::new();
    for frame in 0..300u32 {
        let dt = timer.tick();
        renderer.frame_submissions = 0;
        scene.advance(dt, &mut renderer);

        if frame % 60 == 0 {
            log::info!(
                "frame {frame}: {} submissions, {} loads pending, environment ready: {}",
                renderer.frame_submissions,
                scene.pending_loads(),
                scene.environment_ready()
            );
        }
        std::thread::sleep(std::time::Duration::from_millis(16));
    }

    log::info!(
        "demo complete after {:.1}s, {} nodes in scene",
        timer.total_time(),
        scene.graph().len()
    );
}
