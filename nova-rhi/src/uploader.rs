use crate::ids::ResourceId;

/// The nine opcodes the uploader can queue. `copy_host_to_device_local` and
/// `copy_host_to_device_compressed_texture` are convenience builders on
/// `Uploader` that expand into the staging-buffer-backed primitives below;
/// they are not opcodes of their own.
#[derive(Debug, Clone)]
pub enum UploadOp {
    HostToDeviceShared { dest: ResourceId, offset: u64, data: Vec<u8> },
    HostToDeviceLocalStaging { staging: ResourceId, dest: ResourceId, size: u64 },
    HostToDeviceCompressedTextureStaging { staging: ResourceId, dest: ResourceId, mip: u32 },
    BufferToBuffer { src: ResourceId, dst: ResourceId, src_offset: u64, dst_offset: u64, size: u64 },
    TextureToTexture { src: ResourceId, dst: ResourceId, mip: u32 },
    BufferToTexture { src: ResourceId, dst: ResourceId, mip: u32 },
    TextureToBuffer { src: ResourceId, dst: ResourceId, mip: u32 },
    BlasBuild { blas: ResourceId },
    TlasBuild { tlas: ResourceId },
}

/// A per-mip staging buffer byte length, as read from a cached texture file's
/// mip chain.
#[derive(Debug, Clone, Copy)]
pub struct MipUpload {
    pub mip: u32,
    pub byte_len: u64,
}

/// Deferred command list: callers queue `UploadOp`s across a frame (or across
/// an asset-load background thread), and `Device::flush_uploads` records and
/// submits them on the copy queue in one shot. Never partially flushed --
/// either the whole queued batch is recorded or none of it is, so a failed
/// allocation mid-batch can't leave a dangling half-initialized resource.
#[derive(Debug, Default)]
pub struct Uploader {
    ops: Vec<UploadOp>,
    next_staging_id: u64,
}

impl Uploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[UploadOp] {
        &self.ops
    }

    pub fn take(&mut self) -> Vec<UploadOp> {
        std::mem::take(&mut self.ops)
    }

    /// Queue a direct host-visible write; used for data small/transient
    /// enough that a dedicated staging buffer would be wasteful (e.g. a
    /// per-frame uniform buffer already mapped as host-coherent).
    pub fn copy_host_to_device_shared(&mut self, dest: ResourceId, offset: u64, data: Vec<u8>) {
        self.ops.push(UploadOp::HostToDeviceShared { dest, offset, data });
    }

    /// Allocate a temporary host-visible staging buffer of `size` bytes,
    /// queue the host write into it, then queue a buffer-to-buffer copy into
    /// `dest_buffer`. Mirrors `VulkanDevice::upload_to_buffer_async`'s
    /// staging-buffer pattern.
    pub fn copy_host_to_device_local(&mut self, dest_buffer: ResourceId, size: u64) -> ResourceId {
        let staging = self.alloc_staging_id();
        self.ops.push(UploadOp::HostToDeviceLocalStaging {
            staging,
            dest: dest_buffer,
            size,
        });
        staging
    }

    /// Allocate one staging buffer per mip, sized to that mip's byte length
    /// as read from the cached texture file, and queue a per-mip
    /// buffer-to-texture copy for each.
    pub fn copy_host_to_device_compressed_texture(&mut self, dest_texture: ResourceId, mips: &[MipUpload]) -> Vec<ResourceId> {
        let mut staging_ids = Vec::with_capacity(mips.len());
        for mip in mips {
            let staging = self.alloc_staging_id();
            self.ops.push(UploadOp::HostToDeviceCompressedTextureStaging {
                staging,
                dest: dest_texture,
                mip: mip.mip,
            });
            staging_ids.push(staging);
        }
        staging_ids
    }

    pub fn copy_buffer_to_buffer(&mut self, src: ResourceId, dst: ResourceId, src_offset: u64, dst_offset: u64, size: u64) {
        self.ops.push(UploadOp::BufferToBuffer { src, dst, src_offset, dst_offset, size });
    }

    pub fn copy_texture_to_texture(&mut self, src: ResourceId, dst: ResourceId, mip: u32) {
        self.ops.push(UploadOp::TextureToTexture { src, dst, mip });
    }

    pub fn copy_buffer_to_texture(&mut self, src: ResourceId, dst: ResourceId, mip: u32) {
        self.ops.push(UploadOp::BufferToTexture { src, dst, mip });
    }

    pub fn copy_texture_to_buffer(&mut self, src: ResourceId, dst: ResourceId, mip: u32) {
        self.ops.push(UploadOp::TextureToBuffer { src, dst, mip });
    }

    pub fn build_blas(&mut self, blas: ResourceId) {
        self.ops.push(UploadOp::BlasBuild { blas });
    }

    pub fn build_tlas(&mut self, tlas: ResourceId) {
        self.ops.push(UploadOp::TlasBuild { tlas });
    }

    /// Staging buffers are identified by a private counter rather than the
    /// device's global `IdAllocator`, since they're created and destroyed
    /// entirely within one flush and never exposed to callers as a `Buffer`.
    fn alloc_staging_id(&mut self) -> ResourceId {
        self.next_staging_id += 1;
        ResourceId::from_raw(self.next_staging_id | (1 << 63))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_to_device_local_expands_to_staging_plus_copy_op() {
        let mut uploader = Uploader::new();
        let dest = ResourceId::from_raw(7);
        uploader.copy_host_to_device_local(dest, 256);
        assert_eq!(uploader.ops().len(), 1);
        assert!(matches!(uploader.ops()[0], UploadOp::HostToDeviceLocalStaging { size: 256, .. }));
    }

    #[test]
    fn compressed_texture_upload_allocates_one_staging_buffer_per_mip() {
        let mut uploader = Uploader::new();
        let dest = ResourceId::from_raw(3);
        let mips = [
            MipUpload { mip: 0, byte_len: 1024 },
            MipUpload { mip: 1, byte_len: 256 },
        ];
        let staging_ids = uploader.copy_host_to_device_compressed_texture(dest, &mips);
        assert_eq!(staging_ids.len(), 2);
        assert_eq!(uploader.ops().len(), 2);
    }
}
