//! Shared by every pass's `reconstruct`: load each watched shader's bytecode
//! from the asset cache and rebuild the pipeline through the device. A cache
//! miss (no `NullCompiler`-backed recompilation available) surfaces as a
//! failed rebuild, which `HotReloadablePipeline::check_for_rebuild` already
//! knows how to log and shrug off, keeping the previous pipeline bound.

use nova_assets::{normalize_path, ShaderCache};
use nova_rhi::vulkan::Device;
use nova_rhi::{ComputePipelineDesc, GraphicsPipelineDesc, HotReloadablePipeline, ShaderBytecode, ShaderWatch};

use crate::error::PassResult;

fn load_bytecode(cache: &ShaderCache, watches: &[ShaderWatch]) -> Result<Vec<ShaderBytecode>, String> {
    watches
        .iter()
        .map(|watch| {
            let normalized = normalize_path(&watch.path.to_string_lossy());
            cache.get_from_cache(&normalized).map_err(|e| e.to_string())
        })
        .collect()
}

/// Rebuild when a watched source has changed, via `HotReloadablePipeline::check_for_rebuild`.
/// Used from every pass's `reconstruct`.
pub(crate) fn rebuild_graphics(
    pipeline: &mut HotReloadablePipeline,
    device: &Device,
    shader_cache: &ShaderCache,
    desc: &GraphicsPipelineDesc,
) -> PassResult<()> {
    let mut rebuild_err = None;
    pipeline.check_for_rebuild(|watches| {
        let bytecode = load_bytecode(shader_cache, watches)?;
        device.create_graphics_pipeline(desc, &bytecode).map_err(|e| {
            rebuild_err = Some(e);
            "graphics pipeline creation failed".to_string()
        })
    });
    match rebuild_err {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Build unconditionally. Used once from each pass's constructor so there is
/// a bound pipeline before the first `render`, instead of waiting on the
/// first detected shader change.
pub(crate) fn build_graphics(
    pipeline: &mut HotReloadablePipeline,
    device: &Device,
    shader_cache: &ShaderCache,
    desc: &GraphicsPipelineDesc,
) -> PassResult<()> {
    pipeline
        .force_rebuild(|watches| {
            let bytecode = load_bytecode(shader_cache, watches)?;
            device
                .create_graphics_pipeline(desc, &bytecode)
                .map_err(|e| e.to_string())
        })
        .map_err(|e| crate::error::PassError::PipelineRebuild {
            pass: pipeline.name.clone(),
            reason: e,
        })
}

pub(crate) fn rebuild_compute(
    pipeline: &mut HotReloadablePipeline,
    device: &Device,
    shader_cache: &ShaderCache,
    desc: &ComputePipelineDesc,
) -> PassResult<()> {
    let mut rebuild_err = None;
    pipeline.check_for_rebuild(|watches| {
        let mut bytecode = load_bytecode(shader_cache, watches)?;
        let shader = bytecode.pop().ok_or_else(|| "no compute shader watch registered".to_string())?;
        device.create_compute_pipeline(desc, &shader).map_err(|e| {
            rebuild_err = Some(e);
            "compute pipeline creation failed".to_string()
        })
    });
    match rebuild_err {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

pub(crate) fn build_compute(
    pipeline: &mut HotReloadablePipeline,
    device: &Device,
    shader_cache: &ShaderCache,
    desc: &ComputePipelineDesc,
) -> PassResult<()> {
    pipeline
        .force_rebuild(|watches| {
            let mut bytecode = load_bytecode(shader_cache, watches)?;
            let shader = bytecode.pop().ok_or_else(|| "no compute shader watch registered".to_string())?;
            device.create_compute_pipeline(desc, &shader).map_err(|e| e.to_string())
        })
        .map_err(|e| crate::error::PassError::PipelineRebuild {
            pass: pipeline.name.clone(),
            reason: e,
        })
}
