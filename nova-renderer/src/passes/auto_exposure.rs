//! Two compute dispatches over `hdr_color`: a 256-bin log-luminance histogram,
//! then a weighted-average reduction that writes `targets.luminance` with
//! exponential temporal smoothing. Grounded in the original's auto-exposure
//! pair of compute shaders and `AutoExposureConfig`'s tunables.

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
struct HistogramPushConstants {
    hdr_color: u32,
    histogram: u32,
    min_log_luminance: f32,
    inv_luminance_range: f32,
    width: u32,
    height: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct AveragePushConstants {
    histogram: u32,
    luminance: u32,
    min_log_luminance: f32,
    luminance_range: f32,
    lerp_factor: f32,
    pixel_count: u32,
}

pub struct AutoExposurePass {
    histogram: HotReloadablePipeline,
    average: HotReloadablePipeline,
    shader_cache: Arc<ShaderCache>,
}

impl AutoExposurePass {
    pub fn new(device: &Device, shader_cache: Arc<ShaderCache>) -> PassResult<Self> {
        let mut histogram = HotReloadablePipeline::new("auto_exposure_histogram");
        histogram.add_shader_watch("shaders/AutoExposure/HistogramCompute.hlsl", "Main", ShaderStage::Compute);
        build_compute(&mut histogram, device, &shader_cache, &Self::histogram_desc())?;

        let mut average = HotReloadablePipeline::new("auto_exposure_average");
        average.add_shader_watch("shaders/AutoExposure/AverageCompute.hlsl", "Main", ShaderStage::Compute);
        build_compute(&mut average, device, &shader_cache, &Self::average_desc())?;

        Ok(Self { histogram, average, shader_cache })
    }

    fn histogram_desc() -> ComputePipelineDesc {
        ComputePipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 24, uses_tlas_srv: false },
        }
    }

    fn average_desc() -> ComputePipelineDesc {
        ComputePipelineDesc {
            root_signature: RootSignature { push_constant_bytes: 24, uses_tlas_srv: false },
        }
    }
}

impl Pass for AutoExposurePass {
    fn name(&self) -> &'static str {
        "auto_exposure"
    }

    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()> {
        let cfg = ctx.config.auto_exposure;

        // The histogram buffer carries no meaning between frames -- each pass
        // re-derives it from this frame's `hdr_color` before reducing.
        transition(ctx.encoder, &mut ctx.targets.hdr_color.texture, 0, ResourceState::ShaderRead);

        if let Some(handle) = self.histogram.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        let histogram_push = HistogramPushConstants {
            hdr_color: ctx.targets.hdr_color.srv_index(),
            histogram: ctx.targets.histogram_index(),
            min_log_luminance: cfg.min_log_luminance,
            inv_luminance_range: 1.0 / cfg.luminance_range,
            width: ctx.width,
            height: ctx.height,
        };
        ctx.encoder.push_constants(0, bytemuck::bytes_of(&histogram_push));
        ctx.encoder.dispatch((ctx.width + 15) / 16, (ctx.height + 15) / 16, 1);

        if let Some(handle) = self.average.current() {
            ctx.encoder.bind_pipeline(handle);
        }
        // `1 - exp(-dt*tau)` is the standard exponential-smoothing lerp factor:
        // it converges faster at high `tau` / low frame rate without ever
        // overshooting the target log-luminance in a single frame.
        let lerp_factor = 1.0 - (-ctx.dt * cfg.tau).exp();
        let average_push = AveragePushConstants {
            histogram: ctx.targets.histogram_index(),
            luminance: ctx.targets.luminance.uav_index(),
            min_log_luminance: cfg.min_log_luminance,
            luminance_range: cfg.luminance_range,
            lerp_factor,
            pixel_count: ctx.width * ctx.height,
        };
        ctx.encoder.push_constants(0, bytemuck::bytes_of(&average_push));
        ctx.encoder.dispatch(1, 1, 1);

        Ok(())
    }

    fn resize(&mut self, _device: &Device, _width: u32, _height: u32) -> PassResult<()> {
        Ok(())
    }

    fn ui(&self) -> Vec<UiControl> {
        vec![UiControl::Slider { label: "Auto-exposure tau", value: 1.1, min: 0.1, max: 5.0 }]
    }

    fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        rebuild_compute(&mut self.histogram, device, &self.shader_cache, &Self::histogram_desc())?;
        rebuild_compute(&mut self.average, device, &self.shader_cache, &Self::average_desc())?;
        Ok(())
    }
}

