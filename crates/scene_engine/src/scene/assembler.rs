//! Scene assembler
//!
//! Builds the demo scene and drives its per-frame update. Build order is
//! fixed for deterministic draw-list layering: skybox, indirect light,
//! static decorations (with their animation timelines), the
//! asynchronously loaded model, and finally the main directional light.
//!
//! Every frame, [`SceneAssembler::advance`] runs the three update-loop
//! phases in order: deliver finished asset loads, tick animations, then
//! resolve world transforms and submit drawables.

use std::path::Path;
use std::sync::Arc;

use crate::animation::{AnimationScheduler, RepeatMode, Timeline};
use crate::assets::{AssetKind, AssetLoader, AssetSource, LoadContext, LoadedAsset};
use crate::config::SceneSettings;
use crate::foundation::math::{utils, Quat, Transform, Vec3};
use crate::render::Renderer;
use crate::scene::{NodeId, SceneError, SceneGraph};

/// Holds environment pieces until both have arrived
///
/// The skybox and the indirect light load independently;
/// [`Renderer::set_environment`] fires exactly once, when the second of
/// the two is supplied.
#[derive(Debug, Default)]
pub struct EnvironmentSlots {
    skybox: Option<LoadedAsset>,
    indirect_light: Option<LoadedAsset>,
    applied: bool,
}

impl EnvironmentSlots {
    /// Create empty slots
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply the skybox environment map
    pub fn supply_skybox(&mut self, asset: LoadedAsset, renderer: &mut dyn Renderer) {
        self.skybox = Some(asset);
        self.try_apply(renderer);
    }

    /// Supply the indirect light environment map
    pub fn supply_indirect_light(&mut self, asset: LoadedAsset, renderer: &mut dyn Renderer) {
        self.indirect_light = Some(asset);
        self.try_apply(renderer);
    }

    /// Whether the environment has been handed to the renderer
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    fn try_apply(&mut self, renderer: &mut dyn Renderer) {
        if self.applied {
            return;
        }
        if let (Some(skybox), Some(indirect)) = (&self.skybox, &self.indirect_light) {
            renderer.set_environment(skybox, indirect);
            self.applied = true;
            log::info!("scene environment ready");
        }
    }
}

/// Orchestrates graph, loader and animations into a running scene
///
/// Owns the graph root, the animation scheduler and the asset loader.
/// Dropping the assembler cancels all in-flight loads before the graph is
/// torn down, so no completion can ever touch a dead scene.
pub struct SceneAssembler {
    settings: SceneSettings,
    graph: SceneGraph,
    animations: AnimationScheduler,
    loader: AssetLoader,
    environment: EnvironmentSlots,
    root: NodeId,
}

impl SceneAssembler {
    /// Create an empty scene fetching assets from `source`
    pub fn new(settings: SceneSettings, source: Arc<dyn AssetSource>) -> Self {
        let loader = AssetLoader::new(source, settings.loader_threads);
        let mut graph = SceneGraph::new();
        let root = graph.spawn("scene-root");
        Self {
            settings,
            graph,
            animations: AnimationScheduler::new(),
            loader,
            environment: EnvironmentSlots::new(),
            root,
        }
    }

    /// Handle of the scene root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow the node hierarchy
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutably borrow the node hierarchy
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Requests not yet resolved (or drained) by the loader
    pub fn pending_loads(&self) -> usize {
        self.loader.in_flight()
    }

    /// Whether skybox and indirect light are both live on the renderer
    pub fn environment_ready(&self) -> bool {
        self.environment.is_applied()
    }

    /// Build the scene
    ///
    /// Assets resolve asynchronously over subsequent [`Self::advance`]
    /// calls; a failed load logs a warning and its visual is omitted.
    pub fn assemble(&mut self, renderer: &mut dyn Renderer) -> Result<(), SceneError> {
        self.request_environment();
        self.build_decorations()?;
        self.request_model();

        renderer.set_main_light(&self.settings.main_light.to_main_light());
        log::info!("scene assembled, {} loads in flight", self.loader.in_flight());
        Ok(())
    }

    /// Run one update-loop iteration: pump loads, tick animations, submit
    pub fn advance(&mut self, dt: f32, renderer: &mut dyn Renderer) {
        {
            let mut ctx = LoadContext {
                graph: &mut self.graph,
                animations: &mut self.animations,
                renderer: &mut *renderer,
                environment: &mut self.environment,
            };
            self.loader.pump(&mut ctx);
        }

        self.animations.tick(dt, &mut self.graph);
        self.submit_frame(renderer);
    }

    /// Submit every renderable node, parents before children
    fn submit_frame(&mut self, renderer: &mut dyn Renderer) {
        let visible: Vec<NodeId> = self
            .graph
            .traverse(self.root)
            .filter(|&id| self.graph.node(id).drawable().is_some())
            .collect();
        for id in visible {
            let world = self.graph.world_transform(id);
            let node = self.graph.node(id);
            if let Some(drawable) = node.drawable() {
                renderer.submit(&world, drawable, node.casts_shadows());
            }
        }
    }

    fn request_environment(&mut self) {
        self.loader.request(
            self.settings.skybox_path.clone(),
            AssetKind::EnvironmentMap,
            Box::new(|ctx, result| match result {
                Ok(asset) => ctx.environment.supply_skybox(asset, &mut *ctx.renderer),
                Err(e) => log::warn!("skybox unavailable: {e}"),
            }),
        );
        self.loader.request(
            self.settings.indirect_light_path.clone(),
            AssetKind::EnvironmentMap,
            Box::new(|ctx, result| match result {
                Ok(asset) => ctx.environment.supply_indirect_light(asset, &mut *ctx.renderer),
                Err(e) => log::warn!("indirect light unavailable: {e}"),
            }),
        );
    }

    /// Static decorations: a metallic cube animated along a reverse-loop
    /// timeline, with a non-shadow-casting glass cube attached under it
    fn build_decorations(&mut self) -> Result<(), SceneError> {
        let metallic = self.graph.spawn("metallic-cube");
        self.graph.attach(self.root, metallic)?;
        self.request_material(self.settings.metallic_material_path.clone(), metallic);

        let glass = self
            .graph
            .spawn_with("glass-cube", Transform::from_position(Vec3::new(0.3001, 0.0, 0.0)));
        self.graph.set_casts_shadows(glass, false);
        self.graph.attach(metallic, glass)?;
        self.request_material(self.settings.glass_material_path.clone(), glass);

        // 2 s reverse loop carrying position, rotation and scale tracks
        self.animations.register(Timeline::new(
            2.0,
            RepeatMode::ReverseLoop,
            move |graph, value| {
                graph.set_local_transform(
                    metallic,
                    Some(Vec3::new(0.0, 0.0, value)),
                    Some(Quat::from_axis_angle(
                        &Vec3::x_axis(),
                        utils::deg_to_rad(360.0 * value),
                    )),
                    Some(Vec3::new(1.0, 1.0, 1.0 + value)),
                );
            },
        ));
        Ok(())
    }

    /// Request a material and bind it to `node` when it arrives
    fn request_material(&mut self, path: String, node: NodeId) {
        self.loader.request(
            path.clone(),
            AssetKind::Material,
            Box::new(move |ctx, result| match result {
                Ok(asset) => {
                    if ctx.graph.contains(node) {
                        let drawable = ctx.renderer.bind(&asset);
                        ctx.graph.set_drawable(node, drawable);
                    } else {
                        log::debug!("node gone before material '{path}' arrived");
                    }
                }
                Err(e) => log::warn!("material '{path}' unavailable: {e}"),
            }),
        );
    }

    fn request_model(&mut self) {
        let root = self.root;
        let path = self.settings.model_path.clone();
        let name = Path::new(&path)
            .file_stem()
            .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().into_owned());
        self.loader.request(
            path.clone(),
            AssetKind::Model,
            Box::new(move |ctx, result| match result {
                Ok(asset) => {
                    let drawable = ctx.renderer.bind(&asset);
                    let node = ctx.graph.spawn(name);
                    ctx.graph.set_drawable(node, drawable);
                    if let Err(e) = ctx.graph.attach(root, node) {
                        log::warn!("could not attach model node: {e}");
                    }
                }
                // No node is added for a failed model load
                Err(e) => log::warn!("model '{path}' unavailable: {e}"),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::render::RecordingRenderer;
    use approx::assert_relative_eq;
    use std::time::Duration;

    const KTX1: [u8; 12] = [
        0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
    ];

    fn full_source() -> Arc<MemorySource> {
        let mut source = MemorySource::new();
        source.insert("light/test_ibl_skybox.ktx", KTX1.to_vec());
        source.insert("light/test_ibl_ibl.ktx", KTX1.to_vec());
        source.insert("materials/metallic.filamat", vec![0x4D; 4]);
        source.insert("materials/glass.filamat", vec![0x47; 4]);
        source.insert("models/cockroach.glb", b"glTF\x02\x00\x00\x00".to_vec());
        Arc::new(source)
    }

    fn settle(scene: &mut SceneAssembler, renderer: &mut RecordingRenderer) {
        for _ in 0..1000 {
            scene.advance(0.0, renderer);
            if scene.pending_loads() == 0 {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("asset loads never settled");
    }

    #[test]
    fn test_main_light_is_set_at_assembly_time() {
        let mut renderer = RecordingRenderer::new();
        let mut scene = SceneAssembler::new(SceneSettings::default(), full_source());
        scene.assemble(&mut renderer).unwrap();

        let light = renderer.main_light.as_ref().unwrap();
        assert_eq!(light.direction, Vec3::new(0.0, -1.0, 0.0));
        assert!(light.shadow.is_some());
    }

    #[test]
    fn test_environment_applies_once_both_maps_arrive() {
        let mut renderer = RecordingRenderer::new();
        let mut scene = SceneAssembler::new(SceneSettings::default(), full_source());
        scene.assemble(&mut renderer).unwrap();
        assert!(!scene.environment_ready());

        settle(&mut scene, &mut renderer);
        assert!(scene.environment_ready());
        assert_eq!(
            renderer.environment,
            Some((
                "light/test_ibl_skybox.ktx".to_string(),
                "light/test_ibl_ibl.ktx".to_string()
            ))
        );
    }

    #[test]
    fn test_all_visuals_submitted_after_loads_settle() {
        let mut renderer = RecordingRenderer::new();
        let mut scene = SceneAssembler::new(SceneSettings::default(), full_source());
        scene.assemble(&mut renderer).unwrap();
        settle(&mut scene, &mut renderer);

        renderer.clear_frame();
        scene.advance(0.0, &mut renderer);
        // metallic cube, glass cube, model
        assert_eq!(renderer.submissions.len(), 3);
        assert!(renderer.submissions.iter().any(|s| !s.casts_shadows));
    }

    #[test]
    fn test_failed_model_load_adds_no_node() {
        let mut source = MemorySource::new();
        source.insert("materials/metallic.filamat", vec![1]);
        source.insert("materials/glass.filamat", vec![1]);
        // No model, no environment maps
        let mut renderer = RecordingRenderer::new();
        let mut scene = SceneAssembler::new(SceneSettings::default(), Arc::new(source));
        scene.assemble(&mut renderer).unwrap();

        let nodes_after_assemble = scene.graph().len();
        settle(&mut scene, &mut renderer);
        assert_eq!(scene.graph().len(), nodes_after_assemble);
        assert!(!scene.environment_ready());
    }

    #[test]
    fn test_timeline_drives_cube_transform() {
        let mut renderer = RecordingRenderer::new();
        let mut scene = SceneAssembler::new(SceneSettings::default(), full_source());
        scene.assemble(&mut renderer).unwrap();
        settle(&mut scene, &mut renderer);

        // Half of the 2 s reverse loop peaks at progress 1.0
        scene.advance(1.0, &mut renderer);
        let metallic = scene.graph().node(scene.root()).children()[0];
        let local = scene.graph().node(metallic).local_transform().clone();
        assert_relative_eq!(local.position.z, 1.0, epsilon = 1e-5);
        assert_relative_eq!(local.scale.z, 2.0, epsilon = 1e-5);

        // Glass child rides along in world space
        let glass = scene.graph().node(metallic).children()[0];
        let world = scene.graph_mut().world_transform(glass);
        assert_relative_eq!(world.position.x, 0.3001, epsilon = 1e-5);
        assert_relative_eq!(world.position.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_drop_cancels_in_flight_loads() {
        let mut renderer = RecordingRenderer::new();
        let mut scene = SceneAssembler::new(SceneSettings::default(), full_source());
        scene.assemble(&mut renderer).unwrap();
        drop(scene); // must not hang or deliver callbacks
    }
}
