//! Draws the environment cubemap into the depth-failed background pixels of
//! `hdr_color` -- the classic skybox trick: a fullscreen triangle whose
//! vertex shader places every fragment at the far plane, with depth test
//! `LessEqual` and depth write disabled, so it only shades pixels the
//! G-buffer pass left at the cleared far-plane depth.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use nova_assets::ShaderCache;
use nova_rhi::vulkan::Device;
use nova_rhi::{CompareOp, CullMode, Format, GraphicsPipelineDesc, HotReloadablePipeline, ResourceState, RootSignature, ShaderStage};

use crate::error::PassResult;
use crate::graph::{transition, Pass, PassContext, UiControl};

use super::hot_reload::{build_graphics, rebuild_graphics};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SkyPushConstants {
    inv_view_proj: [f32; 16],
    environment_cubemap: u32,
    _pad: [u32; 3],
}

pub struct EnvmapSkyPass {
    pipeline: HotReloadablePipeline,
    shader_cache: Arc<ShaderCache>,
}

impl EnvmapSkyPass {
    pub fn new(device: &Device, shader_cache: Arc<ShaderCache>) -> PassResult<Self> {
        let mut pipeline = HotReloadablePipeline::new("envmap_sky");
        pipeline.add_shader_watch("shaders/EnvmapSky/SkyVert.hlsl", "Main", ShaderStage::Vertex);
        pipeline.add_shader_watch("shaders/EnvmapSky/SkyFrag.hlsl", "Main", ShaderStage::Fragment);
        build_graphics(&mut pipeline, device, &shader_cache, &Self::desc())?;
        Ok(Self { pipeline, shader_cache })
    }

    fn desc() -> GraphicsPipelineDesc {
        GraphicsPipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 80, uses_tlas_srv: false },
            color_formats: vec![Format::Rgba16Float],
            depth_format: Some(Format::D32Float),
            depth_test: true,
            depth_write: false,
            depth_compare: CompareOp::LessEqual,
            cull_mode: CullMode::None,
            topology: nova_rhi::PrimitiveTopology::TriangleList,
        }
    }
}

impl Pass for EnvmapSkyPass {
    fn name(&self) -> &'static str {
        "envmap_sky"
    }

    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()> {
        let Some(environment_cubemap) = ctx.scene.environment_cubemap else {
            return Ok(());
        };

        transition(ctx.encoder, &mut ctx.targets.hdr_color.texture, 0, ResourceState::RenderTarget);
        transition(ctx.encoder, &mut ctx.targets.depth.texture, 0, ResourceState::DepthRead);

        if let Some(handle) = self.pipeline.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        ctx.encoder.begin_render_pass(vec![ctx.targets.hdr_color.texture.id], Some(ctx.targets.depth.texture.id));
        let inv_view_proj = super::math::invert4x4(&ctx.camera.view_proj);
        let push = SkyPushConstants {
            inv_view_proj,
            environment_cubemap: environment_cubemap.0,
            _pad: [0; 3],
        };
        ctx.encoder.push_constants(0, bytemuck::bytes_of(&push));
        ctx.encoder.draw(3, 1, 0, 0);
        ctx.encoder.end_render_pass();

        transition(ctx.encoder, &mut ctx.targets.hdr_color.texture, 0, ResourceState::ShaderReadWrite);

        Ok(())
    }

    fn resize(&mut self, _device: &Device, _width: u32, _height: u32) -> PassResult<()> {
        Ok(())
    }

    fn ui(&self) -> Vec<UiControl> {
        vec![UiControl::Checkbox { label: "Draw environment sky", value: true }]
    }

    fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        rebuild_graphics(&mut self.pipeline, device, &self.shader_cache, &Self::desc())
    }
}
