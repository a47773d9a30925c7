//! Vulkan 1.2 backend. `Device` owns the instance/physical-device/logical-
//! device triad, with descriptor binding bindless throughout: one
//! `ShaderVisible` descriptor set with
//! `UPDATE_AFTER_BIND` + `PARTIALLY_BOUND` binding flags per resource-type
//! array, rather than per-draw descriptor sets.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use log::{info, warn};
use parking_lot::Mutex;

use crate::allocator::Allocator;
use crate::command::CommandBuffer;
use crate::error::{RhiError, RhiResult};
use crate::heaps::{HeapSizes, Heaps};
use crate::ids::{IdAllocator, ResourceId};
use crate::queue::{FramePacing, Queue, QueueKind, FRAMES_IN_FLIGHT};
use crate::resource::ResourceState;

mod barrier;
pub use barrier::{image_barrier_stages_access, image_layout_to_vk};

mod resources;
pub use resources::{BufferHandles, TextureHandles};
pub(crate) use resources::NativeResource;

mod pipelines;

pub(crate) mod translate;

mod upload;

#[cfg(feature = "window")]
mod surface;

/// Tunable constants carried by the RHI crate's ambient configuration layer
/// (heap sizes, validation toggle); frames-in-flight is a fixed constant
/// (`queue::FRAMES_IN_FLIGHT`), not configurable here.
#[derive(Clone)]
pub struct RhiConfig {
    pub heap_sizes: HeapSizes,
    pub enable_validation: bool,
    pub app_name: String,
    /// Display handle of the window a swap chain will eventually be created
    /// against. When set, `Device::new` enables the instance extensions
    /// `ash-window` says that display backend needs, so a later
    /// `Device::create_swapchain` call doesn't have to recreate the instance.
    /// Only present behind the `window` feature.
    #[cfg(feature = "window")]
    pub raw_display_handle: Option<raw_window_handle::RawDisplayHandle>,
}

impl std::fmt::Debug for RhiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhiConfig")
            .field("heap_sizes", &self.heap_sizes)
            .field("enable_validation", &self.enable_validation)
            .field("app_name", &self.app_name)
            .finish()
    }
}

impl Default for RhiConfig {
    fn default() -> Self {
        Self {
            heap_sizes: HeapSizes::default(),
            enable_validation: cfg!(feature = "validation"),
            app_name: "nova".to_string(),
            #[cfg(feature = "window")]
            raw_display_handle: None,
        }
    }
}

fn validation_layer_names() -> Vec<CString> {
    if std::env::var("NOVA_VALIDATION").map(|v| v == "1").unwrap_or(false) {
        vec![CString::new("VK_LAYER_KHRONOS_validation").unwrap()]
    } else {
        Vec::new()
    }
}

/// A built pipeline plus the layout `vkCmdPushConstants`/
/// `vkCmdBindDescriptorSets` need at record time. Vulkan only requires the
/// layout to outlive pipeline *creation*, but a command buffer recorded
/// against this pipeline dereferences the layout again every time it binds
/// descriptors or pushes constants, so both are kept alive together and
/// destroyed together in `destroy_pipeline`.
pub(crate) struct PipelineEntry {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    pub bind_point: vk::PipelineBindPoint,
}

pub struct Device {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub graphics_queue: Queue,
    pub compute_queue: Queue,
    pub copy_queue: Queue,
    pub allocator: Mutex<Allocator>,
    pub heaps: Mutex<Heaps>,
    pub frame_pacing: Mutex<FramePacing>,
    pub ids: IdAllocator,
    bindless_set_layout: vk::DescriptorSetLayout,
    bindless_pool: vk::DescriptorPool,
    bindless_set: vk::DescriptorSet,
    raytracing_supported: bool,
    mesh_shading_supported: bool,
    pub(crate) pipelines: Mutex<HashMap<u64, PipelineEntry>>,
    pub(crate) next_pipeline_id: AtomicU64,
    pub(crate) native_resources: Mutex<HashMap<ResourceId, NativeResource>>,
    /// One command pool per frame-in-flight slot, indexed by
    /// `FramePacing::current_index()`. Resetting slot `n`'s pool is only safe
    /// once `FramePacing::begin_frame` has waited that slot's fence, since
    /// resetting a pool whose command buffer may still be executing on the
    /// GPU is undefined behavior.
    pub(crate) frame_command_pools: Vec<vk::CommandPool>,
    /// One-shot command pool for `flush_uploads`, opened against the copy
    /// queue's family rather than the graphics one used by
    /// `frame_command_pools`.
    pub(crate) upload_command_pool: vk::CommandPool,
    pub(crate) extended_dynamic_state: Option<ash::ext::extended_dynamic_state::Device>,
    pub(crate) debug_utils: Option<ash::ext::debug_utils::Device>,
}

/// Binding indices inside the single bindless descriptor set. Fixed and
/// never renumbered, since a `DescriptorIndex` is meaningless without
/// knowing which binding array it was allocated from.
mod bindless_bindings {
    pub const SAMPLED_TEXTURES: u32 = 0;
    pub const STORAGE_TEXTURES: u32 = 1;
    pub const STORAGE_BUFFERS: u32 = 2;
    pub const SAMPLERS: u32 = 3;
}

impl Device {
    pub fn new(config: RhiConfig) -> RhiResult<Self> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| RhiError::DeviceCreation(format!("failed to load Vulkan: {e}")))?;

        let app_name = CString::new(config.app_name.clone()).unwrap();
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .api_version(vk::API_VERSION_1_2);

        let layers = if config.enable_validation {
            validation_layer_names()
        } else {
            Vec::new()
        };
        let layer_ptrs: Vec<*const i8> = layers.iter().map(|l| l.as_ptr()).collect();

        let instance_extensions = Self::required_instance_extensions(&entry, &config)?;
        let instance_extension_ptrs: Vec<*const i8> = instance_extensions.iter().map(|e| e.as_ptr()).collect();

        let instance_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&instance_extension_ptrs);
        let instance = unsafe { entry.create_instance(&instance_info, None) }
            .map_err(|e| RhiError::DeviceCreation(format!("vkCreateInstance failed: {e}")))?;

        let debug_utils_enabled = instance_extensions.iter().any(|e| e.as_c_str() == ash::ext::debug_utils::NAME);

        let physical_device = Self::pick_physical_device(&instance)?;
        let props = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        info!("selected physical device: {device_name}");

        let queue_families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let graphics_family = Self::find_queue_family(&queue_families, vk::QueueFlags::GRAPHICS)
            .ok_or_else(|| RhiError::DeviceCreation("no graphics-capable queue family".into()))?;
        let compute_family = Self::find_dedicated_queue_family(&queue_families, vk::QueueFlags::COMPUTE)
            .unwrap_or(graphics_family);
        let copy_family = Self::find_dedicated_queue_family(&queue_families, vk::QueueFlags::TRANSFER)
            .unwrap_or(graphics_family);

        let mut unique_families = vec![graphics_family, compute_family, copy_family];
        unique_families.sort_unstable();
        unique_families.dedup();

        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        let mut descriptor_indexing = vk::PhysicalDeviceDescriptorIndexingFeatures::default()
            .shader_sampled_image_array_non_uniform_indexing(true)
            .shader_storage_image_array_non_uniform_indexing(true)
            .shader_storage_buffer_array_non_uniform_indexing(true)
            .descriptor_binding_partially_bound(true)
            .descriptor_binding_update_unused_while_pending(true)
            .descriptor_binding_variable_descriptor_count(true)
            .runtime_descriptor_array(true);

        let (raytracing_supported, mesh_shading_supported, extended_dynamic_state_supported) =
            Self::probe_optional_features(&instance, physical_device);

        let mut device_extensions = vec![ash::khr::swapchain::NAME.as_ptr()];
        if extended_dynamic_state_supported {
            device_extensions.push(ash::ext::extended_dynamic_state::NAME.as_ptr());
        }

        let mut extended_dynamic_state_features =
            vk::PhysicalDeviceExtendedDynamicStateFeaturesEXT::default().extended_dynamic_state(true);

        let mut device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&device_extensions)
            .push_next(&mut descriptor_indexing);
        if extended_dynamic_state_supported {
            device_info = device_info.push_next(&mut extended_dynamic_state_features);
        }

        let device = unsafe { instance.create_device(physical_device, &device_info, None) }
            .map_err(|e| RhiError::DeviceCreation(format!("vkCreateDevice failed: {e}")))?;
        let device = Arc::new(device);

        let graphics_raw = unsafe { device.get_device_queue(graphics_family, 0) };
        let compute_raw = unsafe { device.get_device_queue(compute_family, 0) };
        let copy_raw = unsafe { device.get_device_queue(copy_family, 0) };

        let graphics_queue = Queue {
            kind: QueueKind::Graphics,
            raw: graphics_raw,
            family_index: graphics_family,
        };
        let compute_queue = Queue {
            kind: QueueKind::Compute,
            raw: compute_raw,
            family_index: compute_family,
        };
        let copy_queue = Queue {
            kind: QueueKind::Copy,
            raw: copy_raw,
            family_index: copy_family,
        };

        let memory_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let allocator = Allocator::new(memory_properties);
        let heaps = Heaps::new(config.heap_sizes);
        let frame_pacing = FramePacing::new(device.clone())?;

        let (bindless_set_layout, bindless_pool, bindless_set) =
            Self::create_bindless_set(&device, &config.heap_sizes)?;

        let frame_command_pools = Self::create_frame_command_pools(&device, graphics_family)?;
        let upload_command_pool = {
            let info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(copy_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);
            unsafe { device.create_command_pool(&info, None)? }
        };

        let extended_dynamic_state = if extended_dynamic_state_supported {
            Some(ash::ext::extended_dynamic_state::Device::new(&instance, &device))
        } else {
            None
        };
        let debug_utils = if debug_utils_enabled {
            Some(ash::ext::debug_utils::Device::new(&instance, &device))
        } else {
            None
        };

        Ok(Self {
            entry,
            instance,
            physical_device,
            device,
            graphics_queue,
            compute_queue,
            copy_queue,
            allocator: Mutex::new(allocator),
            heaps: Mutex::new(heaps),
            frame_pacing: Mutex::new(frame_pacing),
            ids: IdAllocator::new(),
            bindless_set_layout,
            bindless_pool,
            bindless_set,
            raytracing_supported,
            mesh_shading_supported,
            pipelines: Mutex::new(HashMap::new()),
            next_pipeline_id: AtomicU64::new(1),
            native_resources: Mutex::new(HashMap::new()),
            frame_command_pools,
            upload_command_pool,
            extended_dynamic_state,
            debug_utils,
        })
    }

    fn required_instance_extensions(entry: &ash::Entry, config: &RhiConfig) -> RhiResult<Vec<CString>> {
        let available = unsafe { entry.enumerate_instance_extension_properties(None) }
            .map_err(|e| RhiError::DeviceCreation(format!("vkEnumerateInstanceExtensionProperties failed: {e}")))?;
        let has = |name: &CStr| {
            available
                .iter()
                .any(|e| CStr::from_bytes_until_nul(bytemuck_cast_i8_slice(&e.extension_name)).map(|n| n == name).unwrap_or(false))
        };

        let mut names = Vec::new();
        if has(ash::ext::debug_utils::NAME) {
            names.push(ash::ext::debug_utils::NAME.to_owned());
        }

        #[cfg(feature = "window")]
        if let Some(display_handle) = config.raw_display_handle {
            let required = ash_window::enumerate_required_extensions(display_handle)
                .map_err(|e| RhiError::DeviceCreation(format!("ash-window enumerate_required_extensions failed: {e}")))?;
            for ext in required {
                let name = unsafe { CStr::from_ptr(*ext) }.to_owned();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        #[cfg(not(feature = "window"))]
        let _ = config;

        Ok(names)
    }

    fn create_frame_command_pools(device: &ash::Device, graphics_family: u32) -> RhiResult<Vec<vk::CommandPool>> {
        let mut pools = Vec::with_capacity(FRAMES_IN_FLIGHT);
        for _ in 0..FRAMES_IN_FLIGHT {
            let info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);
            let pool = unsafe { device.create_command_pool(&info, None)? };
            pools.push(pool);
        }
        Ok(pools)
    }

    fn pick_physical_device(instance: &ash::Instance) -> RhiResult<vk::PhysicalDevice> {
        let devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(|e| RhiError::DeviceCreation(format!("vkEnumeratePhysicalDevices failed: {e}")))?;
        devices
            .into_iter()
            .max_by_key(|&d| {
                let props = unsafe { instance.get_physical_device_properties(d) };
                match props.device_type {
                    vk::PhysicalDeviceType::DISCRETE_GPU => 2,
                    vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
                    _ => 0,
                }
            })
            .ok_or_else(|| RhiError::DeviceCreation("no Vulkan-capable physical device found".into()))
    }

    fn find_queue_family(families: &[vk::QueueFamilyProperties], flags: vk::QueueFlags) -> Option<u32> {
        families
            .iter()
            .position(|f| f.queue_flags.contains(flags))
            .map(|i| i as u32)
    }

    /// Prefer a queue family that supports `flags` but *not* graphics, so
    /// compute/copy work lands on an async queue when the hardware has one.
    fn find_dedicated_queue_family(families: &[vk::QueueFamilyProperties], flags: vk::QueueFlags) -> Option<u32> {
        families
            .iter()
            .position(|f| f.queue_flags.contains(flags) && !f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|i| i as u32)
            .or_else(|| Self::find_queue_family(families, flags))
    }

    fn probe_optional_features(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> (bool, bool, bool) {
        let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device) }
            .unwrap_or_default();
        let has_extension = |name: &CStr| {
            extensions.iter().any(|e| {
                CStr::from_bytes_until_nul(bytemuck_cast_i8_slice(&e.extension_name))
                    .map(|n| n == name)
                    .unwrap_or(false)
            })
        };
        let raytracing = has_extension(ash::khr::acceleration_structure::NAME)
            && has_extension(ash::khr::ray_tracing_pipeline::NAME);
        let mesh_shading = has_extension(ash::ext::mesh_shader::NAME);
        let extended_dynamic_state = has_extension(ash::ext::extended_dynamic_state::NAME);
        if !raytracing {
            warn!("raytracing extensions not present, RT shadow path disabled");
        }
        if !extended_dynamic_state {
            warn!("VK_EXT_extended_dynamic_state not present, dynamic topology switches disabled");
        }
        (raytracing, mesh_shading, extended_dynamic_state)
    }

    fn create_bindless_set(
        device: &ash::Device,
        sizes: &HeapSizes,
    ) -> RhiResult<(vk::DescriptorSetLayout, vk::DescriptorPool, vk::DescriptorSet)> {
        let bindings = [
            vk::DescriptorSetLayoutBinding::default()
                .binding(bindless_bindings::SAMPLED_TEXTURES)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(sizes.shader_visible)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(bindless_bindings::STORAGE_TEXTURES)
                .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(sizes.shader_visible)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(bindless_bindings::STORAGE_BUFFERS)
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(sizes.shader_visible)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(bindless_bindings::SAMPLERS)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .descriptor_count(sizes.sampler)
                .stage_flags(vk::ShaderStageFlags::ALL),
        ];
        let binding_flags = [vk::DescriptorBindingFlags::PARTIALLY_BOUND | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND; 4];
        let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags);
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default()
            .bindings(&bindings)
            .flags(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
            .push_next(&mut flags_info);
        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None)? };

        let pool_sizes = [
            vk::DescriptorPoolSize::default().ty(vk::DescriptorType::SAMPLED_IMAGE).descriptor_count(sizes.shader_visible),
            vk::DescriptorPoolSize::default().ty(vk::DescriptorType::STORAGE_IMAGE).descriptor_count(sizes.shader_visible),
            vk::DescriptorPoolSize::default().ty(vk::DescriptorType::STORAGE_BUFFER).descriptor_count(sizes.shader_visible),
            vk::DescriptorPoolSize::default().ty(vk::DescriptorType::SAMPLER).descriptor_count(sizes.sampler),
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(1)
            .flags(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND);
        let pool = unsafe { device.create_descriptor_pool(&pool_info, None)? };

        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let set = unsafe { device.allocate_descriptor_sets(&alloc_info)? }[0];

        Ok((layout, pool, set))
    }

    pub fn raytracing_supported(&self) -> bool {
        self.raytracing_supported
    }

    pub fn mesh_shading_supported(&self) -> bool {
        self.mesh_shading_supported
    }

    pub(crate) fn extended_dynamic_state_supported(&self) -> bool {
        self.extended_dynamic_state.is_some()
    }

    pub fn raw(&self) -> &Arc<ash::Device> {
        &self.device
    }

    pub fn bindless_set(&self) -> vk::DescriptorSet {
        self.bindless_set
    }

    pub fn bindless_set_layout(&self) -> vk::DescriptorSetLayout {
        self.bindless_set_layout
    }

    /// Translate a logical `ResourceState` transition into the pipeline
    /// stage/access masks and `vk::ImageLayout`s `vkCmdPipelineBarrier`
    /// needs. Ported from `VulkanDevice::image_barrier_stages_access`.
    pub fn state_transition_masks(before: ResourceState, after: ResourceState) -> barrier::TransitionMasks {
        barrier::image_barrier_stages_access(before, after)
    }

    /// Drives one trip around the `FRAMES_IN_FLIGHT` pacing ring: waits for
    /// (and resets) the fence `FRAMES_IN_FLIGHT` submissions behind this one,
    /// resets that slot's command pool now that it's safe to do so, submits
    /// `command_buffer` on the graphics queue signaling the freshly reset
    /// fence, then advances the ring. The frame graph always records graphics
    /// and compute commands into the same `CommandBuffer` (see
    /// `FrameGraph::render_frame`), so this always submits on the universal
    /// graphics queue rather than asking the caller to pick one.
    pub fn submit_frame(&self, command_buffer: CommandBuffer, timeout_ns: u64) -> RhiResult<()> {
        let (slot, fence_raw) = {
            let mut pacing = self.frame_pacing.lock();
            pacing.begin_frame(timeout_ns)?;
            let slot = pacing.current_index();
            (slot, pacing.fence_raw_at(slot))
        };
        let pool = self.frame_command_pools[slot];
        self.graphics_queue.submit_raw(self, pool, &command_buffer, fence_raw)?;
        self.frame_pacing.lock().end_frame();
        Ok(())
    }

    pub(crate) fn record_native_resource(&self, id: ResourceId, resource: NativeResource) {
        self.native_resources.lock().insert(id, resource);
    }

    pub(crate) fn native_resource(&self, id: ResourceId) -> Option<NativeResource> {
        self.native_resources.lock().get(&id).copied()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.upload_command_pool, None);
            for pool in self.frame_command_pools.drain(..) {
                self.device.destroy_command_pool(pool, None);
            }
            for (_, entry) in self.pipelines.lock().drain() {
                self.device.destroy_pipeline(entry.pipeline, None);
                self.device.destroy_pipeline_layout(entry.layout, None);
            }
            self.device.destroy_descriptor_pool(self.bindless_pool, None);
            self.device.destroy_descriptor_set_layout(self.bindless_set_layout, None);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

fn bytemuck_cast_i8_slice(value: &[std::os::raw::c_char]) -> &[u8] {
    // `vk::ExtensionProperties::extension_name` is `[c_char; 256]`; reinterpret
    // as bytes for `CStr::from_bytes_until_nul`. `c_char` is `i8` on every
    // platform this RHI targets.
    unsafe { std::slice::from_raw_parts(value.as_ptr() as *const u8, value.len()) }
}
