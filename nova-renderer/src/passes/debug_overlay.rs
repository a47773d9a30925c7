//! Draws the per-frame debug line list (AABBs, motion vectors, gizmos) over
//! `ldr_color`. Reduced from `debug_renderer.cpp`'s immediate-mode overlay to
//! its line-list contract: one vertex buffer, one pipeline, no text/shape
//! widgets (those are UI and out of scope here).

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use nova_assets::ShaderCache;
use nova_rhi::vulkan::Device;
use nova_rhi::{CompareOp, CullMode, Format, GraphicsPipelineDesc, HotReloadablePipeline, PrimitiveTopology, ResourceState, RootSignature, ShaderStage};

use crate::error::PassResult;
use crate::graph::{transition, Pass, PassContext, UiControl};

use super::hot_reload::{build_graphics, rebuild_graphics};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DebugLinePushConstants {
    view_proj: [f32; 16],
}

pub struct DebugOverlayPass {
    pipeline: HotReloadablePipeline,
    shader_cache: Arc<ShaderCache>,
    enabled: bool,
}

impl DebugOverlayPass {
    pub fn new(device: &Device, shader_cache: Arc<ShaderCache>) -> PassResult<Self> {
        let mut pipeline = HotReloadablePipeline::new("debug_overlay");
        pipeline.add_shader_watch("shaders/DebugOverlay/DebugLineVert.hlsl", "Main", ShaderStage::Vertex);
        pipeline.add_shader_watch("shaders/DebugOverlay/DebugLineFrag.hlsl", "Main", ShaderStage::Fragment);
        build_graphics(&mut pipeline, device, &shader_cache, &Self::desc())?;
        Ok(Self { pipeline, shader_cache, enabled: true })
    }

    fn desc() -> GraphicsPipelineDesc {
        GraphicsPipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 64, uses_tlas_srv: false },
            color_formats: vec![Format::Rgba8Unorm],
            depth_format: None,
            depth_test: false,
            depth_write: false,
            depth_compare: CompareOp::Always,
            cull_mode: CullMode::None,
            topology: PrimitiveTopology::LineList,
        }
    }
}

impl Pass for DebugOverlayPass {
    fn name(&self) -> &'static str {
        "debug_overlay"
    }

    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let Some(lines) = ctx.scene.debug_lines else {
            return Ok(());
        };

        transition(ctx.encoder, &mut ctx.targets.ldr_color.texture, 0, ResourceState::RenderTarget);

        if let Some(handle) = self.pipeline.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        ctx.encoder.begin_render_pass(vec![ctx.targets.ldr_color.texture.id], None);
        let push = DebugLinePushConstants { view_proj: ctx.camera.view_proj };
        ctx.encoder.push_constants(0, bytemuck::bytes_of(&push));
        ctx.encoder.bind_vertex_buffer(lines.vertex_buffer, 0);
        ctx.encoder.draw(lines.vertex_count, 1, 0, 0);
        ctx.encoder.end_render_pass();

        transition(ctx.encoder, &mut ctx.targets.ldr_color.texture, 0, ResourceState::ShaderReadWrite);

        Ok(())
    }

    fn resize(&mut self, _device: &Device, _width: u32, _height: u32) -> PassResult<()> {
        Ok(())
    }

    fn ui(&self) -> Vec<UiControl> {
        vec![UiControl::Checkbox { label: "Show debug overlay", value: self.enabled }]
    }

    fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        rebuild_graphics(&mut self.pipeline, device, &self.shader_cache, &Self::desc())
    }
}
