//! Applies exposure, contrast, and saturation to `hdr_color` in place, reading
//! the auto-exposure pass's smoothed `luminance` texture to drive exposure.
//! Grounded in `ColorCorrectionConfig`'s three tunables.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use nova_assets::ShaderCache;
use nova_rhi::vulkan::Device;
use nova_rhi::{ComputePipelineDesc, HotReloadablePipeline, ResourceState, RootSignature, ShaderStage};

use crate::error::PassResult;
use crate::graph::{transition, Pass, PassContext, UiControl};

use super::hot_reload::{build_compute, rebuild_compute};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ColorCorrectionPushConstants {
    hdr_color: u32,
    luminance: u32,
    exposure: f32,
    contrast: f32,
    saturation: f32,
    width: u32,
    height: u32,
    _pad: u32,
}

pub struct ColorCorrectionPass {
    pipeline: HotReloadablePipeline,
    shader_cache: Arc<ShaderCache>,
}

impl ColorCorrectionPass {
    pub fn new(device: &Device, shader_cache: Arc<ShaderCache>) -> PassResult<Self> {
        let mut pipeline = HotReloadablePipeline::new("color_correction");
        pipeline.add_shader_watch("shaders/ColorCorrection/ColorCorrectionCompute.hlsl", "Main", ShaderStage::Compute);
        build_compute(&mut pipeline, device, &shader_cache, &Self::desc())?;
        Ok(Self { pipeline, shader_cache })
    }

    fn desc() -> ComputePipelineDesc {
        ComputePipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 32, uses_tlas_srv: false },
        }
    }
}

impl Pass for ColorCorrectionPass {
    fn name(&self) -> &'static str {
        "color_correction"
    }

    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()> {
        transition(ctx.encoder, &mut ctx.targets.hdr_color.texture, 0, ResourceState::ShaderReadWrite);

        if let Some(handle) = self.pipeline.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        let cfg = ctx.config.color_correction;
        let push = ColorCorrectionPushConstants {
            hdr_color: ctx.targets.hdr_color.uav_index(),
            luminance: ctx.targets.luminance.srv_index(),
            exposure: cfg.exposure,
            contrast: cfg.contrast,
            saturation: cfg.saturation,
            width: ctx.width,
            height: ctx.height,
            _pad: 0,
        };
        ctx.encoder.push_constants(0, bytemuck::bytes_of(&push));
        ctx.encoder.dispatch((ctx.width + 7) / 8, (ctx.height + 7) / 8, 1);

        Ok(())
    }

    fn resize(&mut self, _device: &Device, _width: u32, _height: u32) -> PassResult<()> {
        Ok(())
    }

    fn ui(&self) -> Vec<UiControl> {
        vec![
            UiControl::Slider { label: "Exposure", value: 1.0, min: 0.0, max: 4.0 },
            UiControl::Slider { label: "Contrast", value: 1.0, min: 0.0, max: 2.0 },
            UiControl::Slider { label: "Saturation", value: 1.0, min: 0.0, max: 2.0 },
        ]
    }

    fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        rebuild_compute(&mut self.pipeline, device, &self.shader_cache, &Self::desc())
    }
}
