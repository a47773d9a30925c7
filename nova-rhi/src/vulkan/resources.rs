use ash::vk;

use crate::error::{RhiError, RhiResult};
use crate::ids::DescriptorIndex;
use crate::resource::{Buffer, BufferDesc, BufferUsage, Format, ResourceState, Texture, TextureDesc, TextureUsage};

use super::bindless_bindings;
use super::Device;

fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsage::COPY_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    if usage.contains(BufferUsage::ACCEL_STORAGE) {
        flags |= vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR;
    }
    if usage.contains(BufferUsage::ACCEL_SCRATCH) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    flags
}

pub(crate) fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        Format::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
        Format::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        Format::R32Float => vk::Format::R32_SFLOAT,
        Format::D32Float => vk::Format::D32_SFLOAT,
        Format::Bc1Unorm => vk::Format::BC1_RGBA_UNORM_BLOCK,
        Format::Bc7Unorm => vk::Format::BC7_UNORM_BLOCK,
    }
}

fn texture_usage_to_vk(usage: TextureUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsage::STORAGE) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(TextureUsage::RENDER_TARGET) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUsage::DEPTH_STENCIL) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUsage::COPY_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(TextureUsage::COPY_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    flags
}

/// Native Vulkan handles for a `Buffer`/`Texture`, kept out of the
/// backend-agnostic `resource` module so the `vk::Buffer`/`vk::Image` fields
/// live on the concrete Vulkan-side struct rather than the portable type.
pub struct BufferHandles {
    pub buffer: vk::Buffer,
    pub block_index: usize,
    pub offset: u64,
}

pub struct TextureHandles {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub block_index: usize,
    pub offset: u64,
}

/// A resource's native handle, keyed by `ResourceId` so command translation
/// (which only ever sees `ResourceId`s, recorded by passes that don't know
/// about `vk::Buffer`/`vk::Image`) can resolve what to actually operate on.
#[derive(Clone, Copy)]
pub(crate) enum NativeResource {
    Buffer { buffer: vk::Buffer },
    Image { image: vk::Image, view: vk::ImageView, aspect: vk::ImageAspectFlags, width: u32, height: u32 },
}

impl Device {
    pub fn create_buffer(&self, desc: BufferDesc) -> RhiResult<(Buffer, BufferHandles)> {
        let usage = buffer_usage_to_vk(desc.usage) | vk::BufferUsageFlags::TRANSFER_DST;
        let info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { self.raw().create_buffer(&info, None)? };
        let requirements = unsafe { self.raw().get_buffer_memory_requirements(buffer) };

        let memory_type = self
            .allocator
            .lock()
            .find_memory_type(requirements.memory_type_bits, !desc.host_visible)?;
        let (block_index, offset) = self.allocator.lock().alloc(
            self.raw(),
            requirements.size,
            requirements.alignment,
            memory_type,
            desc.host_visible,
        )?;
        let memory = self.allocator.lock().block_memory(block_index);
        unsafe { self.raw().bind_buffer_memory(buffer, memory, offset)? };

        let id = self.ids.next();
        self.record_native_resource(id, NativeResource::Buffer { buffer });
        let resource = Buffer {
            id,
            desc,
            state: ResourceState::Undefined,
            descriptor_index: None,
        };
        Ok((resource, BufferHandles { buffer, block_index, offset }))
    }

    pub fn create_texture(&self, desc: TextureDesc) -> RhiResult<(Texture, TextureHandles)> {
        let format = format_to_vk(desc.format);
        let usage = texture_usage_to_vk(desc.usage) | vk::ImageUsageFlags::TRANSFER_DST;
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: 1,
            })
            .mip_levels(desc.mip_count.max(1))
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let image = unsafe { self.raw().create_image(&image_info, None)? };
        let requirements = unsafe { self.raw().get_image_memory_requirements(image) };

        let memory_type = self.allocator.lock().find_memory_type(requirements.memory_type_bits, true)?;
        let (block_index, offset) = self.allocator.lock().alloc(
            self.raw(),
            requirements.size,
            requirements.alignment,
            memory_type,
            false,
        )?;
        let memory = self.allocator.lock().block_memory(block_index);
        unsafe { self.raw().bind_image_memory(image, memory, offset)? };

        let aspect = if desc.usage.contains(TextureUsage::DEPTH_STENCIL) {
            vk::ImageAspectFlags::DEPTH
        } else {
            vk::ImageAspectFlags::COLOR
        };
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: desc.mip_count.max(1),
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe { self.raw().create_image_view(&view_info, None)? };

        let id = self.ids.next();
        self.record_native_resource(id, NativeResource::Image { image, view, aspect, width: desc.width, height: desc.height });
        let resource = Texture::new(id, desc);
        Ok((resource, TextureHandles { image, view, block_index, offset }))
    }

    /// Assign a `DescriptorIndex` out of the `ShaderVisible` heap's storage-
    /// buffer array and write the descriptor. Idempotent: calling this again
    /// on an already-bound buffer just rewrites the same slot.
    pub fn bind_storage_buffer(&self, resource: &mut Buffer, handles: &BufferHandles) -> RhiResult<()> {
        let index = match resource.descriptor_index {
            Some(i) => i,
            None => {
                let i = self.heaps.lock().shader_visible.allocate()?;
                resource.descriptor_index = Some(i);
                i
            }
        };
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: handles.buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.bindless_set())
            .dst_binding(bindless_bindings::STORAGE_BUFFERS)
            .dst_array_element(index.0)
            .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
            .buffer_info(&buffer_info);
        unsafe { self.raw().update_descriptor_sets(&[write], &[]) };
        Ok(())
    }

    /// Assign `mip`'s `DescriptorIndex` out of the `ShaderVisible` heap's
    /// sampled-image array and write the descriptor. Idempotent: calling this
    /// again on an already-bound mip just rewrites the same slot. Every mip
    /// currently shares the whole-resource `ImageView` `handles.view` covers,
    /// since this RHI doesn't yet create a per-mip `vk::ImageView`.
    pub fn bind_sampled_texture(&self, resource: &mut Texture, handles: &TextureHandles, mip: u32) -> RhiResult<DescriptorIndex> {
        let index = match resource.srv_indices[mip as usize] {
            Some(i) => i,
            None => {
                let i = self.heaps.lock().shader_visible.allocate()?;
                resource.srv_indices[mip as usize] = Some(i);
                i
            }
        };
        let image_info = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: handles.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.bindless_set())
            .dst_binding(bindless_bindings::SAMPLED_TEXTURES)
            .dst_array_element(index.0)
            .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
            .image_info(&image_info);
        unsafe { self.raw().update_descriptor_sets(&[write], &[]) };
        Ok(index)
    }

    /// Assign `mip`'s `DescriptorIndex` out of the `ShaderVisible` heap's
    /// storage-image array, the UAV counterpart to `bind_sampled_texture`.
    pub fn bind_storage_texture(&self, resource: &mut Texture, handles: &TextureHandles, mip: u32) -> RhiResult<DescriptorIndex> {
        let index = match resource.uav_indices[mip as usize] {
            Some(i) => i,
            None => {
                let i = self.heaps.lock().shader_visible.allocate()?;
                resource.uav_indices[mip as usize] = Some(i);
                i
            }
        };
        let image_info = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: handles.view,
            image_layout: vk::ImageLayout::GENERAL,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.bindless_set())
            .dst_binding(bindless_bindings::STORAGE_TEXTURES)
            .dst_array_element(index.0)
            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
            .image_info(&image_info);
        unsafe { self.raw().update_descriptor_sets(&[write], &[]) };
        Ok(index)
    }

    pub fn destroy_buffer(&self, resource: &Buffer, handles: BufferHandles) {
        if let Some(index) = resource.descriptor_index {
            self.heaps.lock().shader_visible.free(index);
        }
        self.native_resources.lock().remove(&resource.id);
        unsafe { self.raw().destroy_buffer(handles.buffer, None) };
    }

    pub fn destroy_texture(&self, resource: &Texture, handles: TextureHandles) {
        let mut heaps = self.heaps.lock();
        for index in resource.srv_indices.iter().chain(resource.uav_indices.iter()).flatten() {
            heaps.shader_visible.free(*index);
        }
        drop(heaps);
        self.native_resources.lock().remove(&resource.id);
        unsafe {
            self.raw().destroy_image_view(handles.view, None);
            self.raw().destroy_image(handles.image, None);
        }
    }
}

/// Surfaced for callers that need to format a capacity-exhaustion message
/// without reaching into the vulkan module directly.
pub fn describe_allocation_failure(kind: &'static str, size: u64, reason: impl std::fmt::Display) -> RhiError {
    RhiError::ResourceAllocation {
        kind,
        size,
        reason: reason.to_string(),
    }
}
