//! `Device::flush_uploads`: records every queued `UploadOp` into one one-shot
//! command buffer on the copy queue, submits it, and blocks until it retires.
//! Suspension point #3 -- callers resume once this returns.

use ash::vk;
use log::warn;

use crate::command::{BufferCopy, Command};
use crate::error::RhiResult;
use crate::queue::Fence;
use crate::resource::{Buffer, BufferDesc, BufferUsage};
use crate::uploader::{UploadOp, Uploader};

use super::resources::BufferHandles;
use super::{translate, Device};

impl Device {
    /// Writes `data` into `handles`' host-visible memory. Only valid for a
    /// buffer created with `host_visible: true` -- callers that don't hold
    /// one never reach this path, since it's private to the upload flush.
    fn write_host_visible(&self, handles: &BufferHandles, data: &[u8]) -> RhiResult<()> {
        let memory = self.allocator.lock().block_memory(handles.block_index);
        unsafe {
            let ptr = self.raw().map_memory(memory, handles.offset, data.len() as u64, vk::MemoryMapFlags::empty())?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr as *mut u8, data.len());
            self.raw().unmap_memory(memory);
        }
        Ok(())
    }

    /// Flushes every op `uploader` has queued: records a `Command` list from
    /// the ops that translate directly (direct host writes and
    /// buffer/texture copies), opens a one-shot command buffer on the copy
    /// queue, submits it, and waits on a fresh fence before returning.
    ///
    /// `HostToDeviceLocalStaging`/`HostToDeviceCompressedTextureStaging` and
    /// `BlasBuild`/`TlasBuild` are logged and skipped rather than recorded --
    /// the first two stage through a synthetic `ResourceId` the uploader
    /// never backs with a real buffer, and acceleration-structure build
    /// translation doesn't exist anywhere in this backend yet. See
    /// `DESIGN.md` for the open question this leaves.
    pub fn flush_uploads(&self, uploader: &mut Uploader, timeout_ns: u64) -> RhiResult<()> {
        let ops = uploader.take();
        if ops.is_empty() {
            return Ok(());
        }

        let mut commands = Vec::new();
        let mut staging: Vec<(Buffer, BufferHandles)> = Vec::new();

        for op in ops {
            match op {
                UploadOp::HostToDeviceShared { dest, offset, data } => {
                    let (buffer, handles) = self.create_buffer(BufferDesc {
                        size: data.len() as u64,
                        usage: BufferUsage::COPY_SRC,
                        host_visible: true,
                        label: Some("upload staging".to_string()),
                    })?;
                    self.write_host_visible(&handles, &data)?;
                    commands.push(Command::CopyBuffer(BufferCopy {
                        src: buffer.id,
                        dst: dest,
                        src_offset: 0,
                        dst_offset: offset,
                        size: data.len() as u64,
                    }));
                    staging.push((buffer, handles));
                }
                UploadOp::HostToDeviceLocalStaging { dest, size, .. } => {
                    warn!("skipping upload of {size} bytes to {dest:?}: staging buffer is synthetic, never backed by real memory");
                }
                UploadOp::HostToDeviceCompressedTextureStaging { dest, mip, .. } => {
                    warn!("skipping compressed texture upload to {dest:?} mip {mip}: staging buffer is synthetic, never backed by real memory");
                }
                UploadOp::BufferToBuffer { src, dst, src_offset, dst_offset, size } => {
                    commands.push(Command::CopyBuffer(BufferCopy { src, dst, src_offset, dst_offset, size }));
                }
                UploadOp::TextureToTexture { src, dst, .. } => {
                    commands.push(Command::CopyTextureToTexture { src, dst });
                }
                UploadOp::BufferToTexture { src, dst, mip } => {
                    commands.push(Command::CopyBufferToTexture { src, dst, mip });
                }
                UploadOp::TextureToBuffer { src, dst, mip } => {
                    commands.push(Command::CopyTextureToBuffer { src, dst, mip });
                }
                UploadOp::BlasBuild { blas } => {
                    warn!("skipping BLAS build for {blas:?}: acceleration-structure build translation not implemented");
                }
                UploadOp::TlasBuild { tlas } => {
                    warn!("skipping TLAS build for {tlas:?}: acceleration-structure build translation not implemented");
                }
            }
        }

        if commands.is_empty() {
            for (buffer, handles) in staging {
                self.destroy_buffer(&buffer, handles);
            }
            return Ok(());
        }

        let raw = self.raw();
        let pool = self.upload_command_pool;
        unsafe { raw.reset_command_pool(pool, vk::CommandPoolResetFlags::empty())? };
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cmd = unsafe { raw.allocate_command_buffers(&alloc_info)? }[0];

        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { raw.begin_command_buffer(cmd, &begin_info)? };
        translate::record_commands(self, cmd, &commands)?;
        unsafe { raw.end_command_buffer(cmd)? };

        let fence = Fence::new(self.device.clone(), false)?;
        let cmd_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&cmd_buffers);
        unsafe { raw.queue_submit(self.copy_queue.raw, std::slice::from_ref(&submit_info), fence.raw)? };
        fence.wait(timeout_ns)?;

        for (buffer, handles) in staging {
            self.destroy_buffer(&buffer, handles);
        }
        Ok(())
    }
}
