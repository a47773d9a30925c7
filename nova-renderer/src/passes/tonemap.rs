//! Resolves `hdr_color` down to `ldr_color` with the configured tonemapping
//! curve. Grounded in `ToneMappingMode`'s Aces/Reinhard selector.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use nova_assets::ShaderCache;
use nova_rhi::vulkan::Device;
use nova_rhi::{ComputePipelineDesc, HotReloadablePipeline, ResourceState, RootSignature, ShaderStage};

use crate::config::ToneMappingMode;
use crate::error::PassResult;
use crate::graph::{transition, Pass, PassContext, UiControl};

use super::hot_reload::{build_compute, rebuild_compute};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct TonemapPushConstants {
    hdr_color: u32,
    ldr_color: u32,
    mode: u32,
    width: u32,
    height: u32,
    _pad: [u32; 3],
}

pub struct TonemapPass {
    pipeline: HotReloadablePipeline,
    shader_cache: Arc<ShaderCache>,
}

impl TonemapPass {
    pub fn new(device: &Device, shader_cache: Arc<ShaderCache>) -> PassResult<Self> {
        let mut pipeline = HotReloadablePipeline::new("tonemap");
        pipeline.add_shader_watch("shaders/Tonemap/TonemapCompute.hlsl", "Main", ShaderStage::Compute);
        build_compute(&mut pipeline, device, &shader_cache, &Self::desc())?;
        Ok(Self { pipeline, shader_cache })
    }

    fn desc() -> ComputePipelineDesc {
        ComputePipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 32, uses_tlas_srv: false },
        }
    }

    fn mode_code(mode: ToneMappingMode) -> u32 {
        match mode {
            ToneMappingMode::Aces => 0,
            ToneMappingMode::Reinhard => 1,
        }
    }
}

impl Pass for TonemapPass {
    fn name(&self) -> &'static str {
        "tonemap"
    }

    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()> {
        transition(ctx.encoder, &mut ctx.targets.hdr_color.texture, 0, ResourceState::ShaderRead);
        transition(ctx.encoder, &mut ctx.targets.ldr_color.texture, 0, ResourceState::ShaderReadWrite);

        if let Some(handle) = self.pipeline.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        let push = TonemapPushConstants {
            hdr_color: ctx.targets.hdr_color.srv_index(),
            ldr_color: ctx.targets.ldr_color.uav_index(),
            mode: Self::mode_code(ctx.config.tone_mapping),
            width: ctx.width,
            height: ctx.height,
            _pad: [0; 3],
        };
        ctx.encoder.push_constants(0, bytemuck::bytes_of(&push));
        ctx.encoder.dispatch((ctx.width + 7) / 8, (ctx.height + 7) / 8, 1);

        Ok(())
    }

    fn resize(&mut self, _device: &Device, _width: u32, _height: u32) -> PassResult<()> {
        Ok(())
    }

    fn ui(&self) -> Vec<UiControl> {
        vec![UiControl::Checkbox { label: "Use ACES (vs Reinhard)", value: true }]
    }

    fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        rebuild_compute(&mut self.pipeline, device, &self.shader_cache, &Self::desc())
    }
}
