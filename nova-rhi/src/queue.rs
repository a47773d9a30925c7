use crate::command::CommandBuffer;
use crate::error::{RhiError, RhiResult};

#[cfg(feature = "vulkan")]
use ash::vk;
#[cfg(feature = "vulkan")]
use std::sync::Arc;

/// The three queues a device exposes: graphics, compute, and copy. Fixed at
/// exactly these three rather than a Vulkan-implementation-defined set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Graphics,
    Compute,
    Copy,
}

/// A GPU-signalled synchronization point. Wraps a binary `vk::Fence` today;
/// the field is private so a future move to Vulkan timeline semaphores
/// doesn't change the public API.
#[derive(Debug)]
pub struct Fence {
    #[cfg(feature = "vulkan")]
    pub(crate) device: Arc<ash::Device>,
    #[cfg(feature = "vulkan")]
    pub(crate) raw: vk::Fence,
    signaled: bool,
}

#[cfg(feature = "vulkan")]
impl Fence {
    pub fn new(device: Arc<ash::Device>, signaled: bool) -> RhiResult<Self> {
        let mut flags = vk::FenceCreateFlags::empty();
        if signaled {
            flags |= vk::FenceCreateFlags::SIGNALED;
        }
        let info = vk::FenceCreateInfo::default().flags(flags);
        let raw = unsafe { device.create_fence(&info, None)? };
        Ok(Self { device, raw, signaled })
    }

    pub fn wait(&self, timeout_ns: u64) -> RhiResult<()> {
        let result = unsafe { self.device.wait_for_fences(&[self.raw], true, timeout_ns) };
        match result {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(RhiError::GpuTimeout {
                millis: timeout_ns / 1_000_000,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn reset(&mut self) -> RhiResult<()> {
        unsafe { self.device.reset_fences(&[self.raw])? };
        self.signaled = false;
        Ok(())
    }

    pub fn is_signaled(&self) -> RhiResult<bool> {
        let status = unsafe { self.device.get_fence_status(self.raw) };
        match status {
            Ok(()) => Ok(true),
            Err(vk::Result::NOT_READY) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(feature = "vulkan")]
impl Drop for Fence {
    fn drop(&mut self) {
        unsafe { self.device.destroy_fence(self.raw, None) };
    }
}

/// A command queue plus the fence ring used to pace `FRAMES_IN_FLIGHT`
/// submissions. One `Queue` is created per `QueueKind`; the graphics queue's
/// ring is what `Device::begin_frame`/`end_frame` advance.
pub struct Queue {
    pub kind: QueueKind,
    #[cfg(feature = "vulkan")]
    pub(crate) raw: vk::Queue,
    pub(crate) family_index: u32,
}

impl Queue {
    pub fn family_index(&self) -> u32 {
        self.family_index
    }
}

/// Number of frames the CPU is allowed to run ahead of the GPU. Fixed at 3
/// per spec; not configurable since the uploader's staging-ring and the
/// per-frame descriptor churn budget are both sized against this constant.
pub const FRAMES_IN_FLIGHT: usize = 3;

/// Tracks which of the `FRAMES_IN_FLIGHT` fences the CPU is currently
/// waiting behind, and rotates to the next slot at the end of a frame.
pub struct FramePacing {
    fences: Vec<Fence>,
    current: usize,
}

impl FramePacing {
    #[cfg(feature = "vulkan")]
    pub fn new(device: Arc<ash::Device>) -> RhiResult<Self> {
        let mut fences = Vec::with_capacity(FRAMES_IN_FLIGHT);
        for _ in 0..FRAMES_IN_FLIGHT {
            fences.push(Fence::new(device.clone(), true)?);
        }
        Ok(Self { fences, current: 0 })
    }

    /// Block until the fence `FRAMES_IN_FLIGHT` submissions ago has signaled,
    /// then reset it for reuse by the frame about to be recorded.
    pub fn begin_frame(&mut self, timeout_ns: u64) -> RhiResult<&mut Fence> {
        let fence = &mut self.fences[self.current];
        fence.wait(timeout_ns)?;
        fence.reset()?;
        Ok(fence)
    }

    pub fn end_frame(&mut self) {
        self.current = (self.current + 1) % FRAMES_IN_FLIGHT;
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    #[cfg(feature = "vulkan")]
    pub(crate) fn fence_raw_at(&self, index: usize) -> vk::Fence {
        self.fences[index].raw
    }
}

#[cfg(feature = "vulkan")]
impl Queue {
    /// Record `command_buffer`'s software `Command` list into a fresh
    /// primary `vk::CommandBuffer` allocated from `pool` (translation lives in
    /// `vulkan::translate`, which needs the device's pipeline/native-resource
    /// registries), then submit it on this queue, signaling `signal_fence` if
    /// given. `pool` must not be in use by a still-in-flight submission --
    /// callers that reuse a pool across frames (`Device::submit_frame`) are
    /// responsible for having already waited on the fence that guards it.
    pub fn submit(
        &self,
        device: &crate::vulkan::Device,
        pool: vk::CommandPool,
        command_buffer: &CommandBuffer,
        signal_fence: Option<&Fence>,
    ) -> RhiResult<()> {
        let fence_raw = signal_fence.map(|f| f.raw).unwrap_or(vk::Fence::null());
        self.submit_raw(device, pool, command_buffer, fence_raw)
    }

    /// Same as `submit`, but takes the raw `vk::Fence` handle directly rather
    /// than a borrowed `Fence`. `Device::submit_frame` needs this: it can't
    /// hold a `&Fence` borrowed out of the `frame_pacing` mutex guard across
    /// the submit call without holding the lock for the duration, so it reads
    /// the `vk::Fence` (which is `Copy`) out first and drops the guard.
    pub(crate) fn submit_raw(
        &self,
        device: &crate::vulkan::Device,
        pool: vk::CommandPool,
        command_buffer: &CommandBuffer,
        signal_fence: vk::Fence,
    ) -> RhiResult<()> {
        let raw = device.raw();
        unsafe { raw.reset_command_pool(pool, vk::CommandPoolResetFlags::empty())? };
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cmd = unsafe { raw.allocate_command_buffers(&alloc_info)? }[0];

        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { raw.begin_command_buffer(cmd, &begin_info)? };
        crate::vulkan::translate::record_commands(device, cmd, command_buffer.commands())?;
        unsafe { raw.end_command_buffer(cmd)? };

        let cmd_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&cmd_buffers);
        unsafe { raw.queue_submit(self.raw, std::slice::from_ref(&submit_info), signal_fence)? };
        Ok(())
    }
}
