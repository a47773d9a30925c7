use crate::error::RhiResult;
use crate::ids::ResourceId;
use crate::resource::Format;

#[cfg(feature = "vulkan")]
use std::sync::Arc;

#[cfg(feature = "vulkan")]
use ash::vk;

/// Presentation target. Image acquisition/present live here rather than on
/// `Device` directly, keeping the swapchain's own lifetime separate from the
/// device's. Built by `Device::create_swapchain` (behind the `window`
/// feature); nothing else constructs one.
pub struct Swapchain {
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub images: Vec<ResourceId>,
    pub(crate) image_index: Option<u32>,
    #[cfg(feature = "vulkan")]
    pub(crate) device: Arc<ash::Device>,
    #[cfg(feature = "vulkan")]
    pub(crate) image_views: Vec<vk::ImageView>,
    #[cfg(feature = "vulkan")]
    pub(crate) image_available: vk::Semaphore,
    #[cfg(feature = "vulkan")]
    pub(crate) surface_loader: ash::khr::surface::Instance,
    #[cfg(feature = "vulkan")]
    pub(crate) surface: vk::SurfaceKHR,
    #[cfg(feature = "vulkan")]
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    #[cfg(feature = "vulkan")]
    pub(crate) swapchain: vk::SwapchainKHR,
}

impl Swapchain {
    /// Blocks (up to `timeout_ns`) until the next presentable image is ready,
    /// rotating `image_index` to match. Mirrors suspension point #1: nothing
    /// past this call may touch the new frame's back buffer until it returns.
    #[cfg(feature = "vulkan")]
    pub fn acquire_next_image(&mut self, timeout_ns: u64) -> RhiResult<ResourceId> {
        let (index, _suboptimal) = unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, timeout_ns, self.image_available, vk::Fence::null())
        }
        .map_err(|e| crate::error::RhiError::Vulkan(format!("vkAcquireNextImageKHR failed: {e}")))?;
        self.image_index = Some(index);
        Ok(self.images[index as usize])
    }

    /// Presents the image returned by the most recent `acquire_next_image` on
    /// `queue`. Callers must have already waited on the fence guarding the
    /// frame's submission (e.g. via the next `FramePacing::begin_frame`
    /// cycle) before calling this -- presentation here doesn't itself wait on
    /// a per-frame "render finished" semaphore.
    #[cfg(feature = "vulkan")]
    pub fn present(&self, queue: vk::Queue) -> RhiResult<()> {
        let index = self
            .image_index
            .ok_or_else(|| crate::error::RhiError::InvalidUsage("present called before acquire_next_image".into()))?;
        let swapchains = [self.swapchain];
        let indices = [index];
        let present_info = vk::PresentInfoKHR::default().swapchains(&swapchains).image_indices(&indices);
        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
            .map_err(|e| crate::error::RhiError::Vulkan(format!("vkQueuePresentKHR failed: {e}")))?;
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.image_index = None;
    }
}

#[cfg(feature = "vulkan")]
impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for view in self.image_views.drain(..) {
                self.device.destroy_image_view(view, None);
            }
            self.device.destroy_semaphore(self.image_available, None);
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
