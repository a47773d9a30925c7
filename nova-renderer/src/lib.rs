//! Frame graph orchestration: a fixed sequence of passes over the RHI's
//! bindless resources, reading the scene boundary contract and producing one
//! `CommandBuffer` per frame. There is no dependency-graph solver here --
//! `FrameGraph::new` is handed the passes in the order they are meant to run,
//! matching the original's own fixed composition
//! (`RendererSystem::BuildFrameGraph`).

pub mod config;
pub mod error;
pub mod graph;
pub mod passes;
pub mod scene;

use std::path::Path;
use std::sync::Arc;

use nova_assets::ShaderCache;
use nova_rhi::vulkan::Device;

pub use config::RendererConfig;
pub use error::{PassError, PassResult};
pub use graph::{FrameGraph, FrameTargets, Pass, PassContext, UiControl};
pub use scene::{Camera, Scene};

use passes::{
    AutoExposurePass, ColorCorrectionPass, DebugOverlayPass, DeferredPass, EnvmapSkyPass, PresentPass, ShadowPass, TonemapPass,
};

/// Builds the fixed-order frame graph described in § 4.5: Shadows -> Deferred
/// -> Environment-map sky -> Color correction -> Auto-exposure -> Tonemapping
/// -> Debug overlay -> Present.
pub struct Renderer {
    graph: FrameGraph,
    shader_cache: Arc<ShaderCache>,
}

impl Renderer {
    pub fn new(
        device: &Device,
        shader_cache_root: impl AsRef<Path>,
        width: u32,
        height: u32,
        config: &RendererConfig,
    ) -> PassResult<Self> {
        let shader_cache = Arc::new(ShaderCache::new(shader_cache_root.as_ref())?);

        let targets = FrameTargets::create(device, width, height, config.shadow.resolution)?;

        let passes: Vec<Box<dyn Pass>> = vec![
            Box::new(ShadowPass::new(device, shader_cache.clone())?),
            Box::new(DeferredPass::new(device, shader_cache.clone())?),
            Box::new(EnvmapSkyPass::new(device, shader_cache.clone())?),
            Box::new(ColorCorrectionPass::new(device, shader_cache.clone())?),
            Box::new(AutoExposurePass::new(device, shader_cache.clone())?),
            Box::new(TonemapPass::new(device, shader_cache.clone())?),
            Box::new(DebugOverlayPass::new(device, shader_cache.clone())?),
            Box::new(PresentPass::new()),
        ];

        Ok(Self {
            graph: FrameGraph::new(targets, passes),
            shader_cache,
        })
    }

    pub fn render_frame(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        config: &RendererConfig,
        width: u32,
        height: u32,
        dt: f32,
        frame_index: u64,
    ) -> PassResult<nova_rhi::CommandBuffer> {
        self.graph.render_frame(scene, camera, config, width, height, dt, frame_index)
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) -> PassResult<()> {
        self.graph.resize(device, width, height)
    }

    /// Polls every pass's `HotReloadablePipeline` for a changed shader and
    /// rebuilds it. Call once per frame, or on a slower cadence if the
    /// 500ms debounce makes per-frame polling wasteful.
    pub fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        self.graph.reconstruct(device)
    }

    pub fn ui(&self) -> Vec<(&'static str, Vec<UiControl>)> {
        self.graph.ui()
    }

    pub fn targets(&self) -> &FrameTargets {
        self.graph.targets()
    }

    pub fn shader_cache(&self) -> &Arc<ShaderCache> {
        &self.shader_cache
    }
}
