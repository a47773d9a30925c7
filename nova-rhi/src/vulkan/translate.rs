//! Translates a backend-agnostic `Command` list into `ash` calls against one
//! already-open `vk::CommandBuffer`. Kept separate from `queue.rs` since it
//! needs the device's pipeline and native-resource registries, which a
//! `Queue` has no access to.

use ash::vk;

use crate::command::Command;
use crate::error::RhiResult;
use crate::pipeline::PipelineHandle;

use super::resources::NativeResource;
use super::{barrier, Device};

fn pipeline_entry(device: &Device, handle: PipelineHandle) -> Option<(vk::Pipeline, vk::PipelineLayout, vk::PipelineBindPoint)> {
    device.pipelines.lock().get(&handle.0).map(|e| (e.pipeline, e.layout, e.bind_point))
}

/// Resolves a resource to the image handle+view a render-target/clear/
/// barrier command needs. Buffer-only resources (vertex/index/uniform/
/// storage buffers) never reach the image path; callers that hand one to an
/// image-only command (e.g. `ClearRenderTarget`) have a bug upstream, not
/// something this function should paper over, so it returns `None` and the
/// caller skips the command rather than panicking mid-recording.
struct ImageHandle {
    image: vk::Image,
    view: vk::ImageView,
    aspect: vk::ImageAspectFlags,
    width: u32,
    height: u32,
}

fn native_image(device: &Device, id: crate::ids::ResourceId) -> Option<ImageHandle> {
    match device.native_resource(id) {
        Some(NativeResource::Image { image, view, aspect, width, height }) => {
            Some(ImageHandle { image, view, aspect, width, height })
        }
        _ => None,
    }
}

fn native_buffer(device: &Device, id: crate::ids::ResourceId) -> Option<vk::Buffer> {
    match device.native_resource(id) {
        Some(NativeResource::Buffer { buffer }) => Some(buffer),
        _ => None,
    }
}

fn subresource_range(mip: Option<u32>, aspect: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    match mip {
        Some(mip) => vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: mip,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
        None => vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: 1,
        },
    }
}

/// Batches every `Barrier` in one `Command::PipelineBarrier` into a single
/// `vkCmdPipelineBarrier` call: one `vk::ImageMemoryBarrier` per image
/// resource (or per mip, when the barrier names one), and one combined
/// `vk::MemoryBarrier` covering every buffer-only resource in the batch,
/// since Vulkan has no per-buffer-resource barrier finer than a whole-buffer
/// one and this RHI doesn't track buffer sub-ranges.
fn record_barrier(device: &Device, cmd: vk::CommandBuffer, batch: &[crate::command::Barrier]) {
    if batch.is_empty() {
        return;
    }
    let mut image_barriers = Vec::with_capacity(batch.len());
    let mut src_stage = vk::PipelineStageFlags::empty();
    let mut dst_stage = vk::PipelineStageFlags::empty();
    let mut buffer_src_access = vk::AccessFlags::empty();
    let mut buffer_dst_access = vk::AccessFlags::empty();
    let mut has_buffer_barrier = false;

    for b in batch {
        let masks = barrier::image_barrier_stages_access(b.before, b.after);
        src_stage |= masks.src_stage;
        dst_stage |= masks.dst_stage;

        if let Some(img) = native_image(device, b.resource) {
            image_barriers.push(
                vk::ImageMemoryBarrier::default()
                    .old_layout(masks.old_layout)
                    .new_layout(masks.new_layout)
                    .src_access_mask(masks.src_access)
                    .dst_access_mask(masks.dst_access)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(img.image)
                    .subresource_range(subresource_range(b.mip, img.aspect)),
            );
        } else if native_buffer(device, b.resource).is_some() {
            has_buffer_barrier = true;
            buffer_src_access |= masks.src_access;
            buffer_dst_access |= masks.dst_access;
        }
    }

    if image_barriers.is_empty() && !has_buffer_barrier {
        return;
    }

    let memory_barriers = if has_buffer_barrier {
        vec![vk::MemoryBarrier::default().src_access_mask(buffer_src_access).dst_access_mask(buffer_dst_access)]
    } else {
        Vec::new()
    };

    unsafe {
        device.raw().cmd_pipeline_barrier(
            cmd,
            if src_stage.is_empty() { vk::PipelineStageFlags::TOP_OF_PIPE } else { src_stage },
            if dst_stage.is_empty() { vk::PipelineStageFlags::BOTTOM_OF_PIPE } else { dst_stage },
            vk::DependencyFlags::empty(),
            &memory_barriers,
            &[],
            &image_barriers,
        );
    }
}

pub(crate) fn record_commands(device: &Device, cmd: vk::CommandBuffer, commands: &[Command]) -> RhiResult<()> {
    let raw = device.raw();
    let mut bound_layout: Option<vk::PipelineLayout> = None;
    let mut bound_point: Option<vk::PipelineBindPoint> = None;
    let mut rendering_active = false;

    for command in commands {
        match command {
            Command::PipelineBarrier(batch) => record_barrier(device, cmd, batch),

            Command::SetViewport(vp) => {
                let viewport = vk::Viewport {
                    x: vp.x,
                    y: vp.y,
                    width: vp.width,
                    height: vp.height,
                    min_depth: vp.min_depth,
                    max_depth: vp.max_depth,
                };
                unsafe { raw.cmd_set_viewport(cmd, 0, &[viewport]) };
            }

            Command::SetScissor(rect) => {
                let scissor = vk::Rect2D {
                    offset: vk::Offset2D { x: rect.x, y: rect.y },
                    extent: vk::Extent2D { width: rect.width, height: rect.height },
                };
                unsafe { raw.cmd_set_scissor(cmd, 0, &[scissor]) };
            }

            Command::BindPipeline(handle) => {
                if let Some((pipeline, layout, bind_point)) = pipeline_entry(device, *handle) {
                    unsafe { raw.cmd_bind_pipeline(cmd, bind_point, pipeline) };
                    unsafe {
                        raw.cmd_bind_descriptor_sets(cmd, bind_point, layout, 0, &[device.bindless_set()], &[]);
                    }
                    bound_layout = Some(layout);
                    bound_point = Some(bind_point);
                }
            }

            Command::PushConstants { offset, bytes } => {
                if let (Some(layout), Some(bind_point)) = (bound_layout, bound_point) {
                    let stages = match bind_point {
                        vk::PipelineBindPoint::COMPUTE => vk::ShaderStageFlags::COMPUTE,
                        _ => vk::ShaderStageFlags::ALL_GRAPHICS,
                    };
                    unsafe { raw.cmd_push_constants(cmd, layout, stages, *offset, bytes) };
                }
            }

            Command::BeginRenderPass { color_targets, depth_target } => {
                let resolved_color: Vec<ImageHandle> = color_targets.iter().filter_map(|id| native_image(device, *id)).collect();
                let resolved_depth = depth_target.and_then(|id| native_image(device, id));
                let extent = resolved_color
                    .first()
                    .or(resolved_depth.as_ref())
                    .map(|img| vk::Extent2D { width: img.width, height: img.height })
                    .unwrap_or(vk::Extent2D { width: 0, height: 0 });

                let color_attachments: Vec<vk::RenderingAttachmentInfo> = resolved_color
                    .iter()
                    .map(|img| {
                        vk::RenderingAttachmentInfo::default()
                            .image_view(img.view)
                            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                            .load_op(vk::AttachmentLoadOp::LOAD)
                            .store_op(vk::AttachmentStoreOp::STORE)
                    })
                    .collect();
                let depth_attachment = resolved_depth.as_ref().map(|img| {
                    vk::RenderingAttachmentInfo::default()
                        .image_view(img.view)
                        .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                        .load_op(vk::AttachmentLoadOp::LOAD)
                        .store_op(vk::AttachmentStoreOp::STORE)
                });
                let mut rendering_info = vk::RenderingInfo::default()
                    .render_area(vk::Rect2D { offset: vk::Offset2D::default(), extent })
                    .layer_count(1)
                    .color_attachments(&color_attachments);
                if let Some(depth) = depth_attachment.as_ref() {
                    rendering_info = rendering_info.depth_attachment(depth);
                }
                unsafe { raw.cmd_begin_rendering(cmd, &rendering_info) };
                rendering_active = true;
            }

            Command::EndRenderPass => {
                if rendering_active {
                    unsafe { raw.cmd_end_rendering(cmd) };
                    rendering_active = false;
                }
            }

            Command::Draw { vertex_count, instance_count, first_vertex, first_instance } => {
                unsafe { raw.cmd_draw(cmd, *vertex_count, *instance_count, *first_vertex, *first_instance) };
            }

            Command::DrawIndexed { index_count, instance_count, first_index, vertex_offset, first_instance } => {
                unsafe {
                    raw.cmd_draw_indexed(cmd, *index_count, *instance_count, *first_index, *vertex_offset, *first_instance)
                };
            }

            Command::BindVertexBuffer { buffer, offset } => {
                if let Some(buffer) = native_buffer(device, *buffer) {
                    unsafe { raw.cmd_bind_vertex_buffers(cmd, 0, &[buffer], &[*offset]) };
                }
            }

            Command::BindIndexBuffer { buffer, offset } => {
                if let Some(buffer) = native_buffer(device, *buffer) {
                    unsafe { raw.cmd_bind_index_buffer(cmd, buffer, *offset, vk::IndexType::UINT32) };
                }
            }

            Command::Dispatch { x, y, z } => {
                unsafe { raw.cmd_dispatch(cmd, *x, *y, *z) };
            }

            Command::CopyBuffer(copy) => {
                if let (Some(src), Some(dst)) = (native_buffer(device, copy.src), native_buffer(device, copy.dst)) {
                    let region = vk::BufferCopy::default().src_offset(copy.src_offset).dst_offset(copy.dst_offset).size(copy.size);
                    unsafe { raw.cmd_copy_buffer(cmd, src, dst, &[region]) };
                }
            }

            Command::CopyTextureToTexture { src, dst } => {
                if let (Some(src_img), Some(dst_img)) = (native_image(device, *src), native_image(device, *dst)) {
                    let region = vk::ImageCopy::default()
                        .src_subresource(vk::ImageSubresourceLayers {
                            aspect_mask: src_img.aspect,
                            mip_level: 0,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .dst_subresource(vk::ImageSubresourceLayers {
                            aspect_mask: dst_img.aspect,
                            mip_level: 0,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .extent(vk::Extent3D { width: dst_img.width, height: dst_img.height, depth: 1 });
                    unsafe {
                        raw.cmd_copy_image(
                            cmd,
                            src_img.image,
                            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                            dst_img.image,
                            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                            &[region],
                        )
                    };
                }
            }

            Command::CopyBufferToTexture { src, dst, mip } => {
                if let (Some(src_buffer), Some(dst_img)) = (native_buffer(device, *src), native_image(device, *dst)) {
                    let region = vk::BufferImageCopy::default()
                        .image_subresource(vk::ImageSubresourceLayers {
                            aspect_mask: dst_img.aspect,
                            mip_level: *mip,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .image_extent(vk::Extent3D { width: dst_img.width, height: dst_img.height, depth: 1 });
                    unsafe {
                        raw.cmd_copy_buffer_to_image(cmd, src_buffer, dst_img.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &[region])
                    };
                }
            }

            Command::CopyTextureToBuffer { src, dst, mip } => {
                if let (Some(src_img), Some(dst_buffer)) = (native_image(device, *src), native_buffer(device, *dst)) {
                    let region = vk::BufferImageCopy::default()
                        .image_subresource(vk::ImageSubresourceLayers {
                            aspect_mask: src_img.aspect,
                            mip_level: *mip,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .image_extent(vk::Extent3D { width: src_img.width, height: src_img.height, depth: 1 });
                    unsafe {
                        raw.cmd_copy_image_to_buffer(cmd, src_img.image, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, dst_buffer, &[region])
                    };
                }
            }

            Command::ClearRenderTarget { target, color } => {
                if let Some(img) = native_image(device, *target) {
                    let value = vk::ClearColorValue { float32: *color };
                    let range = subresource_range(None, img.aspect);
                    unsafe { raw.cmd_clear_color_image(cmd, img.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &value, &[range]) };
                }
            }

            Command::ClearDepthTarget { target, depth } => {
                if let Some(img) = native_image(device, *target) {
                    let value = vk::ClearDepthStencilValue { depth: *depth, stencil: 0 };
                    let range = subresource_range(None, img.aspect);
                    unsafe {
                        raw.cmd_clear_depth_stencil_image(cmd, img.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &value, &[range])
                    };
                }
            }

            Command::ClearUav { target, value } => match device.native_resource(*target) {
                Some(NativeResource::Image { image, aspect, .. }) => {
                    let clear = vk::ClearColorValue { uint32: *value };
                    let range = subresource_range(None, aspect);
                    unsafe { raw.cmd_clear_color_image(cmd, image, vk::ImageLayout::GENERAL, &clear, &[range]) };
                }
                Some(NativeResource::Buffer { buffer }) => {
                    unsafe { raw.cmd_fill_buffer(cmd, buffer, 0, vk::WHOLE_SIZE, value[0]) };
                }
                None => {}
            },

            Command::SetTopology(topology) => {
                if let Some(loader) = device.extended_dynamic_state.as_ref() {
                    let vk_topology = match topology {
                        crate::pipeline::PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
                        crate::pipeline::PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
                    };
                    unsafe { loader.cmd_set_primitive_topology(cmd, vk_topology) };
                }
            }

            Command::BeginEvent(label) => {
                if let Some(loader) = device.debug_utils.as_ref() {
                    if let Ok(name) = std::ffi::CString::new(label.as_str()) {
                        let info = vk::DebugUtilsLabelEXT::default().label_name(&name);
                        unsafe { loader.cmd_begin_debug_utils_label(cmd, &info) };
                    }
                }
            }

            Command::EndEvent => {
                if let Some(loader) = device.debug_utils.as_ref() {
                    unsafe { loader.cmd_end_debug_utils_label(cmd) };
                }
            }

            Command::InsertMarker(label) => {
                if let Some(loader) = device.debug_utils.as_ref() {
                    if let Ok(name) = std::ffi::CString::new(label.as_str()) {
                        let info = vk::DebugUtilsLabelEXT::default().label_name(&name);
                        unsafe { loader.cmd_insert_debug_utils_label(cmd, &info) };
                    }
                }
            }
        }
    }

    Ok(())
}
