use std::sync::atomic::Ordering;

use ash::vk;

use crate::error::{RhiError, RhiResult};
use crate::pipeline::{ComputePipelineDesc, CompareOp, CullMode, GraphicsPipelineDesc, PipelineHandle, PrimitiveTopology};
use crate::shader::{ShaderBytecode, ShaderStage};

use super::resources::format_to_vk;
use super::Device;

fn stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::None => vk::ShaderStageFlags::empty(),
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
        ShaderStage::Mesh => vk::ShaderStageFlags::MESH_EXT,
        ShaderStage::Amplification => vk::ShaderStageFlags::TASK_EXT,
        ShaderStage::Raytracing => vk::ShaderStageFlags::RAYGEN_KHR,
    }
}

fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
    }
}

fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

impl Device {
    fn create_shader_module(&self, bytecode: &ShaderBytecode) -> RhiResult<vk::ShaderModule> {
        let info = vk::ShaderModuleCreateInfo::default().code(&bytecode.words);
        unsafe { self.raw().create_shader_module(&info, None) }
            .map_err(|e| RhiError::Vulkan(format!("shader module creation failed: {e}")))
    }

    fn push_constant_layout(&self, bytes: u32, stages: vk::ShaderStageFlags) -> RhiResult<vk::PipelineLayout> {
        let range = vk::PushConstantRange::default().stage_flags(stages).offset(0).size(bytes);
        let set_layouts = [self.bindless_set_layout()];
        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(std::slice::from_ref(&range));
        unsafe { self.raw().create_pipeline_layout(&info, None) }
            .map_err(|e| RhiError::Vulkan(format!("pipeline layout creation failed: {e}")))
    }

    fn register_pipeline(&self, pipeline: vk::Pipeline, layout: vk::PipelineLayout, bind_point: vk::PipelineBindPoint) -> PipelineHandle {
        let id = self.next_pipeline_id.fetch_add(1, Ordering::Relaxed);
        self.pipelines.lock().insert(id, super::PipelineEntry { pipeline, layout, bind_point });
        PipelineHandle(id)
    }

    /// Builds a graphics pipeline from bindless `RootSignature`-shaped push
    /// constants: a single pipeline layout (bindless set + inline push
    /// constants, no other descriptor sets) and dynamic viewport/scissor so
    /// passes don't need per-resize pipeline rebuilds. The shader modules are
    /// transient -- Vulkan only requires them to outlive pipeline *creation*.
    /// The layout is not: `vkCmdPushConstants`/`vkCmdBindDescriptorSets` need a
    /// live layout at command-recording time, so it's kept in the pipeline
    /// registry and destroyed alongside the pipeline (`destroy_pipeline`).
    pub fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc, stages: &[ShaderBytecode]) -> RhiResult<PipelineHandle> {
        let modules: Vec<vk::ShaderModule> = stages
            .iter()
            .map(|s| self.create_shader_module(s))
            .collect::<RhiResult<_>>()?;
        let entry = std::ffi::CString::new(crate::shader::SHADER_ENTRY_POINT).unwrap();
        let stage_infos: Vec<vk::PipelineShaderStageCreateInfo> = modules
            .iter()
            .zip(stages)
            .map(|(module, bytecode)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage_to_vk(bytecode.stage))
                    .module(*module)
                    .name(&entry)
            })
            .collect();

        let layout = self.push_constant_layout(desc.root_signature.push_constant_bytes, vk::ShaderStageFlags::ALL_GRAPHICS);
        let layout = match layout {
            Ok(l) => l,
            Err(e) => {
                for module in modules {
                    unsafe { self.raw().destroy_shader_module(module, None) };
                }
                return Err(e);
            }
        };

        let color_formats: Vec<vk::Format> = desc.color_formats.iter().copied().map(format_to_vk).collect();
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);
        if let Some(depth) = desc.depth_format {
            rendering_info = rendering_info.depth_attachment_format(format_to_vk(depth));
        }

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();
        let input_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::default().topology(topology_to_vk(desc.topology));
        let viewport_state = vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);
        let raster = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(cull_mode_to_vk(desc.cull_mode))
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);
        let multisample = vk::PipelineMultisampleStateCreateInfo::default().rasterization_samples(vk::SampleCountFlags::TYPE_1);
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_test)
            .depth_write_enable(desc.depth_write)
            .depth_compare_op(compare_op_to_vk(desc.depth_compare));
        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = color_formats
            .iter()
            .map(|_| vk::PipelineColorBlendAttachmentState::default().color_write_mask(vk::ColorComponentFlags::RGBA))
            .collect();
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);
        let mut dynamic_states = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        if self.extended_dynamic_state_supported() {
            dynamic_states.push(vk::DynamicState::PRIMITIVE_TOPOLOGY_EXT);
        }
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .push_next(&mut rendering_info)
            .stages(&stage_infos)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&raster)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout);

        let result = unsafe {
            self.raw()
                .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_info), None)
        };

        unsafe {
            for module in modules {
                self.raw().destroy_shader_module(module, None);
            }
        }

        let pipelines = match result {
            Ok(p) => p,
            Err((_, e)) => {
                unsafe { self.raw().destroy_pipeline_layout(layout, None) };
                return Err(RhiError::Vulkan(format!("graphics pipeline creation failed: {e}")));
            }
        };
        Ok(self.register_pipeline(pipelines[0], layout, vk::PipelineBindPoint::GRAPHICS))
    }

    pub fn create_compute_pipeline(&self, desc: &ComputePipelineDesc, shader: &ShaderBytecode) -> RhiResult<PipelineHandle> {
        let module = self.create_shader_module(shader)?;
        let entry = std::ffi::CString::new(crate::shader::SHADER_ENTRY_POINT).unwrap();
        let layout = match self.push_constant_layout(desc.root_signature.push_constant_bytes, vk::ShaderStageFlags::COMPUTE) {
            Ok(l) => l,
            Err(e) => {
                unsafe { self.raw().destroy_shader_module(module, None) };
                return Err(e);
            }
        };
        let stage_info = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(module)
            .name(&entry);
        let pipeline_info = vk::ComputePipelineCreateInfo::default().stage(stage_info).layout(layout);
        let result = unsafe {
            self.raw()
                .create_compute_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_info), None)
        };

        unsafe { self.raw().destroy_shader_module(module, None) };

        let pipelines = match result {
            Ok(p) => p,
            Err((_, e)) => {
                unsafe { self.raw().destroy_pipeline_layout(layout, None) };
                return Err(RhiError::Vulkan(format!("compute pipeline creation failed: {e}")));
            }
        };
        Ok(self.register_pipeline(pipelines[0], layout, vk::PipelineBindPoint::COMPUTE))
    }

    pub fn destroy_pipeline(&self, handle: PipelineHandle) {
        if let Some(entry) = self.pipelines.lock().remove(&handle.0) {
            unsafe {
                self.raw().destroy_pipeline(entry.pipeline, None);
                self.raw().destroy_pipeline_layout(entry.layout, None);
            }
        }
    }
}
