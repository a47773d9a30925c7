use ash::vk;

use crate::resource::ResourceState;

/// Pipeline-stage and access-mask pair plus the Vulkan image layout a
/// `ResourceState` maps to. `None` for `stage`/`access` on the source side
/// means "top of pipe, no access" (used for transitions out of `Undefined`).
#[derive(Debug, Clone, Copy)]
pub struct TransitionMasks {
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
}

pub fn image_layout_to_vk(state: ResourceState) -> vk::ImageLayout {
    match state {
        ResourceState::Undefined => vk::ImageLayout::UNDEFINED,
        ResourceState::CopySrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ResourceState::CopyDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ResourceState::ShaderRead => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ResourceState::ShaderReadWrite => vk::ImageLayout::GENERAL,
        ResourceState::RenderTarget => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ResourceState::DepthWrite => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ResourceState::DepthRead => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ResourceState::Present => vk::ImageLayout::PRESENT_SRC_KHR,
        // Buffer-only states never reach the image path; map conservatively.
        ResourceState::VertexBuffer
        | ResourceState::IndexBuffer
        | ResourceState::UniformRead
        | ResourceState::AccelStructureBuild
        | ResourceState::AccelStructureRead => vk::ImageLayout::GENERAL,
    }
}

fn stage_access(state: ResourceState) -> (vk::PipelineStageFlags, vk::AccessFlags) {
    use vk::AccessFlags as A;
    use vk::PipelineStageFlags as S;
    match state {
        ResourceState::Undefined => (S::TOP_OF_PIPE, A::empty()),
        ResourceState::CopySrc => (S::TRANSFER, A::TRANSFER_READ),
        ResourceState::CopyDst => (S::TRANSFER, A::TRANSFER_WRITE),
        ResourceState::VertexBuffer => (S::VERTEX_INPUT, A::VERTEX_ATTRIBUTE_READ),
        ResourceState::IndexBuffer => (S::VERTEX_INPUT, A::INDEX_READ),
        ResourceState::UniformRead => (S::VERTEX_SHADER | S::FRAGMENT_SHADER | S::COMPUTE_SHADER, A::UNIFORM_READ),
        ResourceState::ShaderRead => (S::FRAGMENT_SHADER | S::COMPUTE_SHADER, A::SHADER_READ),
        ResourceState::ShaderReadWrite => (S::COMPUTE_SHADER, A::SHADER_READ | A::SHADER_WRITE),
        ResourceState::RenderTarget => (S::COLOR_ATTACHMENT_OUTPUT, A::COLOR_ATTACHMENT_READ | A::COLOR_ATTACHMENT_WRITE),
        ResourceState::DepthWrite => (
            S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
            A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        ResourceState::DepthRead => (S::EARLY_FRAGMENT_TESTS | S::FRAGMENT_SHADER, A::DEPTH_STENCIL_ATTACHMENT_READ | A::SHADER_READ),
        ResourceState::Present => (S::BOTTOM_OF_PIPE, A::empty()),
        ResourceState::AccelStructureBuild => (S::ACCELERATION_STRUCTURE_BUILD_KHR, A::ACCELERATION_STRUCTURE_WRITE_KHR),
        ResourceState::AccelStructureRead => (S::RAY_TRACING_SHADER_KHR, A::ACCELERATION_STRUCTURE_READ_KHR),
    }
}

/// Full before/after mapping used when recording a `vkCmdPipelineBarrier`.
/// Ported from `VulkanDevice::image_barrier_stages_access`'s per-layout-pair
/// transition table, restated over `ResourceState` instead of raw
/// `vk::ImageLayout`s so barrier batching can operate purely on the RHI's own
/// vocabulary.
pub fn image_barrier_stages_access(before: ResourceState, after: ResourceState) -> TransitionMasks {
    let (src_stage, src_access) = stage_access(before);
    let (dst_stage, dst_access) = stage_access(after);
    TransitionMasks {
        old_layout: image_layout_to_vk(before),
        new_layout: image_layout_to_vk(after),
        src_stage,
        dst_stage,
        src_access,
        dst_access,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_to_render_target_has_no_src_access() {
        let masks = image_barrier_stages_access(ResourceState::Undefined, ResourceState::RenderTarget);
        assert_eq!(masks.src_access, vk::AccessFlags::empty());
        assert_eq!(masks.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    }

    #[test]
    fn shader_read_to_render_target_is_a_real_transition() {
        let masks = image_barrier_stages_access(ResourceState::ShaderRead, ResourceState::RenderTarget);
        assert_eq!(masks.old_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(masks.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    }
}
