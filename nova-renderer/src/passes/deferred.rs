//! Fills the G-buffer from opaque draw items, then resolves lighting into
//! `hdr_color` from a compute dispatch. Grounded in the original split between
//! a G-buffer raster pass and a lighting pass, folded into one `Pass` here
//! since the fixed composition names a single "Forward (or Deferred)" slot.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use nova_assets::ShaderCache;
use nova_rhi::vulkan::Device;
use nova_rhi::{
    CompareOp, ComputePipelineDesc, CullMode, Format, GraphicsPipelineDesc, HotReloadablePipeline, ResourceState,
    RootSignature, ShaderStage,
};

use crate::config::DeferredDebugMode;
use crate::error::PassResult;
use crate::graph::{transition, Pass, PassContext, UiControl};

use super::hot_reload::{build_compute, build_graphics, rebuild_compute, rebuild_graphics};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GBufferPushConstants {
    transform: [f32; 16],
    albedo: u32,
    normal: u32,
    metallic_roughness: u32,
    emissive: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LightingPushConstants {
    inv_view_proj: [f32; 16],
    albedo: u32,
    normal: u32,
    pbr: u32,
    velocity: u32,
    depth: u32,
    shadow_map: u32,
    hdr_out: u32,
    light_direction: [f32; 3],
    _pad0: u32,
    light_color: [f32; 3],
    light_intensity: f32,
    mode: u32,
    ibl_enabled: u32,
    width: u32,
    height: u32,
}

pub struct DeferredPass {
    gbuffer: HotReloadablePipeline,
    lighting: HotReloadablePipeline,
    shader_cache: Arc<ShaderCache>,
}

impl DeferredPass {
    pub fn new(device: &Device, shader_cache: Arc<ShaderCache>) -> PassResult<Self> {
        let mut gbuffer = HotReloadablePipeline::new("deferred_gbuffer");
        gbuffer.add_shader_watch("shaders/Deferred/GBufferVert.hlsl", "Main", ShaderStage::Vertex);
        gbuffer.add_shader_watch("shaders/Deferred/GBufferFrag.hlsl", "Main", ShaderStage::Fragment);
        build_graphics(&mut gbuffer, device, &shader_cache, &Self::gbuffer_desc())?;

        let mut lighting = HotReloadablePipeline::new("deferred_lighting");
        lighting.add_shader_watch("shaders/Deferred/LightingCompute.hlsl", "Main", ShaderStage::Compute);
        build_compute(&mut lighting, device, &shader_cache, &Self::lighting_desc())?;

        Ok(Self { gbuffer, lighting, shader_cache })
    }

    fn gbuffer_desc() -> GraphicsPipelineDesc {
        GraphicsPipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 80, uses_tlas_srv: false },
            color_formats: vec![Format::Rgba8Unorm, Format::Rgba16Float, Format::Rgba8Unorm, Format::Rgba16Float],
            depth_format: Some(Format::D32Float),
            depth_test: true,
            depth_write: true,
            depth_compare: CompareOp::Less,
            cull_mode: CullMode::Back,
            topology: nova_rhi::PrimitiveTopology::TriangleList,
        }
    }

    fn lighting_desc() -> ComputePipelineDesc {
        ComputePipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 140, uses_tlas_srv: false },
        }
    }

    fn debug_mode_code(mode: DeferredDebugMode) -> u32 {
        match mode {
            DeferredDebugMode::Default => 0,
            DeferredDebugMode::Albedo => 1,
            DeferredDebugMode::Normal => 2,
            DeferredDebugMode::MetallicRoughness => 3,
            DeferredDebugMode::AmbientOcclusion => 4,
            DeferredDebugMode::Emissive => 5,
            DeferredDebugMode::Specular => 6,
            DeferredDebugMode::Ambient => 7,
            DeferredDebugMode::Position => 8,
            DeferredDebugMode::Velocity => 9,
        }
    }

}

impl Pass for DeferredPass {
    fn name(&self) -> &'static str {
        "deferred"
    }

    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()> {
        transition(ctx.encoder, &mut ctx.targets.gbuffer_albedo.texture, 0, ResourceState::RenderTarget);
        transition(ctx.encoder, &mut ctx.targets.gbuffer_normal.texture, 0, ResourceState::RenderTarget);
        transition(ctx.encoder, &mut ctx.targets.gbuffer_pbr.texture, 0, ResourceState::RenderTarget);
        transition(ctx.encoder, &mut ctx.targets.gbuffer_velocity.texture, 0, ResourceState::RenderTarget);
        transition(ctx.encoder, &mut ctx.targets.depth.texture, 0, ResourceState::DepthWrite);

        if let Some(handle) = self.gbuffer.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        ctx.encoder.begin_render_pass(
            vec![
                ctx.targets.gbuffer_albedo.texture.id,
                ctx.targets.gbuffer_normal.texture.id,
                ctx.targets.gbuffer_pbr.texture.id,
                ctx.targets.gbuffer_velocity.texture.id,
            ],
            Some(ctx.targets.depth.texture.id),
        );
        for item in &ctx.scene.draw_items {
            let push = GBufferPushConstants {
                transform: item.transform,
                albedo: item.material.albedo.0,
                normal: item.material.normal.0,
                metallic_roughness: item.material.metallic_roughness.0,
                emissive: item.material.emissive.0,
            };
            ctx.encoder.push_constants(0, bytemuck::bytes_of(&push));
            ctx.encoder.bind_vertex_buffer(item.vertex_buffer, 0);
            ctx.encoder.bind_index_buffer(item.index_buffer, 0);
            ctx.encoder.draw_indexed(item.index_count, 1, 0, 0, 0);
        }
        ctx.encoder.end_render_pass();

        transition(ctx.encoder, &mut ctx.targets.gbuffer_albedo.texture, 0, ResourceState::ShaderRead);
        transition(ctx.encoder, &mut ctx.targets.gbuffer_normal.texture, 0, ResourceState::ShaderRead);
        transition(ctx.encoder, &mut ctx.targets.gbuffer_pbr.texture, 0, ResourceState::ShaderRead);
        transition(ctx.encoder, &mut ctx.targets.gbuffer_velocity.texture, 0, ResourceState::ShaderRead);
        transition(ctx.encoder, &mut ctx.targets.depth.texture, 0, ResourceState::ShaderRead);
        transition(ctx.encoder, &mut ctx.targets.hdr_color.texture, 0, ResourceState::ShaderReadWrite);

        if let Some(handle) = self.lighting.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        let inv_view_proj = super::math::invert4x4(&ctx.camera.view_proj);
        let push = LightingPushConstants {
            inv_view_proj,
            albedo: ctx.targets.gbuffer_albedo.srv_index(),
            normal: ctx.targets.gbuffer_normal.srv_index(),
            pbr: ctx.targets.gbuffer_pbr.srv_index(),
            velocity: ctx.targets.gbuffer_velocity.srv_index(),
            depth: ctx.targets.depth.srv_index(),
            shadow_map: ctx.targets.shadow_map.srv_index(),
            hdr_out: ctx.targets.hdr_color.uav_index(),
            light_direction: ctx.scene.directional_light.direction,
            _pad0: 0,
            light_color: ctx.scene.directional_light.color,
            light_intensity: ctx.scene.directional_light.intensity,
            mode: Self::debug_mode_code(ctx.config.deferred_debug_mode),
            ibl_enabled: ctx.config.ibl_enabled as u32,
            width: ctx.width,
            height: ctx.height,
        };
        ctx.encoder.push_constants(0, bytemuck::bytes_of(&push));
        let groups_x = (ctx.width + 7) / 8;
        let groups_y = (ctx.height + 7) / 8;
        ctx.encoder.dispatch(groups_x, groups_y, 1);

        Ok(())
    }

    fn resize(&mut self, _device: &Device, _width: u32, _height: u32) -> PassResult<()> {
        Ok(())
    }

    fn ui(&self) -> Vec<UiControl> {
        vec![UiControl::Checkbox { label: "Enable IBL", value: true }]
    }

    fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        rebuild_graphics(&mut self.gbuffer, device, &self.shader_cache, &Self::gbuffer_desc())?;
        rebuild_compute(&mut self.lighting, device, &self.shader_cache, &Self::lighting_desc())?;
        Ok(())
    }
}
