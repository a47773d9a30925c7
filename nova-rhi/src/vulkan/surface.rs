//! Swap-chain construction. Gated behind the `window` feature since it's the
//! only place this crate reaches for a native window handle; everything else
//! in `nova-rhi` stays windowing-agnostic. Mirrors `Device::create_buffer`/
//! `create_texture`'s allocate-then-register-native-handle shape, except the
//! swap-chain images are owned by the presentation engine rather than this
//! crate's allocator.

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::error::{RhiError, RhiResult};
use crate::resource::Format;
use crate::swapchain::Swapchain;

use super::resources::NativeResource;
use super::Device;

fn vk_format_to_rhi(format: vk::Format) -> Format {
    match format {
        vk::Format::R8G8B8A8_SRGB | vk::Format::B8G8R8A8_SRGB => Format::Rgba8UnormSrgb,
        _ => Format::Rgba8Unorm,
    }
}

impl Device {
    pub fn create_swapchain(
        &self,
        raw_window_handle: RawWindowHandle,
        raw_display_handle: RawDisplayHandle,
        width: u32,
        height: u32,
    ) -> RhiResult<Swapchain> {
        let surface_loader = ash::khr::surface::Instance::new(&self.entry, &self.instance);
        let surface = unsafe {
            ash_window::create_surface(&self.entry, &self.instance, raw_display_handle, raw_window_handle, None)
        }
        .map_err(|e| RhiError::DeviceCreation(format!("surface creation failed: {e}")))?;

        let supported = unsafe {
            surface_loader.get_physical_device_surface_support(self.physical_device, self.graphics_queue.family_index(), surface)
        }
        .unwrap_or(false);
        if !supported {
            unsafe { surface_loader.destroy_surface(surface, None) };
            return Err(RhiError::DeviceCreation(
                "graphics queue family does not support presenting to this surface".into(),
            ));
        }

        let capabilities = unsafe { surface_loader.get_physical_device_surface_capabilities(self.physical_device, surface) }?;
        let formats = unsafe { surface_loader.get_physical_device_surface_formats(self.physical_device, surface) }?;
        let chosen = formats
            .iter()
            .find(|f| f.format == vk::Format::B8G8R8A8_UNORM)
            .or_else(|| formats.first())
            .copied()
            .ok_or_else(|| RhiError::DeviceCreation("surface exposes no formats".into()))?;

        let max_image_count = if capabilities.max_image_count == 0 { u32::MAX } else { capabilities.max_image_count };
        let image_count = (capabilities.min_image_count + 1).min(max_image_count);
        let extent = vk::Extent2D {
            width: width.clamp(capabilities.min_image_extent.width.max(1), capabilities.max_image_extent.width.max(1)),
            height: height.clamp(capabilities.min_image_extent.height.max(1), capabilities.max_image_extent.height.max(1)),
        };

        let swapchain_loader = ash::khr::swapchain::Device::new(&self.instance, &self.device);
        let info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(chosen.format)
            .image_color_space(chosen.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true);
        let swapchain = match unsafe { swapchain_loader.create_swapchain(&info, None) } {
            Ok(s) => s,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                return Err(RhiError::DeviceCreation(format!("vkCreateSwapchainKHR failed: {e}")));
            }
        };

        let raw_images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }?;
        let mut images = Vec::with_capacity(raw_images.len());
        let mut image_views = Vec::with_capacity(raw_images.len());
        for image in raw_images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(chosen.format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe { self.raw().create_image_view(&view_info, None)? };
            let id = self.ids.next();
            self.record_native_resource(
                id,
                NativeResource::Image {
                    image,
                    view,
                    aspect: vk::ImageAspectFlags::COLOR,
                    width: extent.width,
                    height: extent.height,
                },
            );
            images.push(id);
            image_views.push(view);
        }

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let image_available = unsafe { self.raw().create_semaphore(&semaphore_info, None)? };

        Ok(Swapchain {
            format: vk_format_to_rhi(chosen.format),
            width: extent.width,
            height: extent.height,
            images,
            image_index: None,
            device: self.device.clone(),
            image_views,
            image_available,
            surface_loader,
            surface,
            swapchain_loader,
            swapchain,
        })
    }
}
