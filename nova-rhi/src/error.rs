use thiserror::Error;

/// Fatal and non-fatal error kinds surfaced by the RHI.
///
/// `DeviceCreation`, `ResourceAllocation`, and `DescriptorExhaustion` are fatal:
/// callers should log and unwind rather than attempt recovery. `ShaderCompilation`,
/// `AssetLoad`, `GpuTimeout`, and `FileIo` are recoverable and are handled at the
/// asset-cache/pass boundary rather than here.
#[derive(Debug, Error)]
pub enum RhiError {
    #[error("failed to create device: {0}")]
    DeviceCreation(String),

    #[error("failed to allocate {kind} of {size} bytes: {reason}")]
    ResourceAllocation {
        kind: &'static str,
        size: u64,
        reason: String,
    },

    #[error("descriptor heap {heap} exhausted (capacity {capacity})")]
    DescriptorExhaustion { heap: &'static str, capacity: u32 },

    #[error("GPU operation timed out after {millis}ms")]
    GpuTimeout { millis: u64 },

    #[error("vulkan call failed: {0}")]
    Vulkan(String),

    #[error("invalid usage: {0}")]
    InvalidUsage(String),
}

pub type RhiResult<T> = Result<T, RhiError>;

#[cfg(feature = "vulkan")]
impl From<ash::vk::Result> for RhiError {
    fn from(value: ash::vk::Result) -> Self {
        RhiError::Vulkan(value.to_string())
    }
}
