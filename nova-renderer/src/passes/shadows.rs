//! Renders opaque geometry into the shadow map from the sun's directional
//! view-projection. Grounded in the original's shadow pass: an orthographic
//! projection over `OrthoBounds`, depth-only, single hot-reloadable pipeline.

use std::sync::Arc;

use nova_assets::ShaderCache;
use nova_rhi::vulkan::Device;
use nova_rhi::{CompareOp, CullMode, GraphicsPipelineDesc, HotReloadablePipeline, ResourceState, RootSignature, ShaderStage};

use crate::error::PassResult;
use crate::graph::{transition, Pass, PassContext, UiControl};

use super::hot_reload::{build_graphics, rebuild_graphics};

pub struct ShadowPass {
    pipeline: HotReloadablePipeline,
    shader_cache: Arc<ShaderCache>,
}

impl ShadowPass {
    pub fn new(device: &Device, shader_cache: Arc<ShaderCache>) -> PassResult<Self> {
        let mut pipeline = HotReloadablePipeline::new("shadows");
        pipeline.add_shader_watch("shaders/Shadow/ShadowVert.hlsl", "Main", ShaderStage::Vertex);
        // Depth-only: no fragment watch, matching a pipeline with no bound
        // color render targets.
        build_graphics(&mut pipeline, device, &shader_cache, &Self::desc())?;
        Ok(Self { pipeline, shader_cache })
    }

    fn desc() -> GraphicsPipelineDesc {
        GraphicsPipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 80, uses_tlas_srv: false },
            color_formats: Vec::new(),
            depth_format: Some(nova_rhi::Format::D32Float),
            depth_test: true,
            depth_write: true,
            depth_compare: CompareOp::Less,
            cull_mode: CullMode::Back,
            topology: nova_rhi::PrimitiveTopology::TriangleList,
        }
    }
}

impl Pass for ShadowPass {
    fn name(&self) -> &'static str {
        "shadows"
    }

    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()> {
        transition(ctx.encoder, &mut ctx.targets.shadow_map.texture, 0, ResourceState::DepthWrite);

        if let Some(handle) = self.pipeline.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        ctx.encoder.begin_render_pass(Vec::new(), Some(ctx.targets.shadow_map.texture.id));
        for item in &ctx.scene.draw_items {
            // Light view-proj composition is out of scope for the RHI layer;
            // the orthographic bounds live in `ctx.config.shadow.ortho_bounds`
            // and are pushed by the concrete light's transform upstream.
            ctx.encoder.push_constants(0, bytemuck::cast_slice(&item.transform));
            ctx.encoder.bind_vertex_buffer(item.vertex_buffer, 0);
            ctx.encoder.bind_index_buffer(item.index_buffer, 0);
            ctx.encoder.draw_indexed(item.index_count, 1, 0, 0, 0);
        }
        ctx.encoder.end_render_pass();

        transition(ctx.encoder, &mut ctx.targets.shadow_map.texture, 0, ResourceState::ShaderRead);
        Ok(())
    }

    fn resize(&mut self, _device: &Device, _width: u32, _height: u32) -> PassResult<()> {
        // The shadow map's resolution is a config constant independent of
        // swap-chain size; `FrameTargets::resize` leaves it untouched.
        Ok(())
    }

    fn ui(&self) -> Vec<UiControl> {
        vec![UiControl::Checkbox { label: "Enable shadows", value: true }]
    }

    fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        rebuild_graphics(&mut self.pipeline, device, &self.shader_cache, &Self::desc())
    }
}
