//! Explicit, bindless, low-level render hardware interface.
//!
//! The public surface splits into a backend-agnostic resource/command
//! vocabulary and a concrete Vulkan implementation; resource binding is
//! bindless end to end, with no descriptor-set-per-draw API. Every
//! `Texture`/`Buffer` that needs to be
//! read from a shader is assigned a `DescriptorIndex` out of the device's
//! single `ShaderVisible` heap, and that index travels to the shader as a
//! push constant.

pub mod allocator;
pub mod command;
pub mod error;
pub mod heaps;
pub mod ids;
pub mod pipeline;
pub mod queue;
pub mod resource;
pub mod shader;
pub mod swapchain;
pub mod uploader;

#[cfg(feature = "vulkan")]
pub mod vulkan;

#[cfg(feature = "vulkan")]
pub use vulkan::{Device, RhiConfig};

pub use command::{Barrier, BufferCopy, Command, CommandBuffer, CommandEncoder, Rect2D, Viewport};
pub use error::{RhiError, RhiResult};
pub use heaps::{DescriptorHeap, HeapKind, HeapSizes, Heaps};
pub use ids::{DescriptorIndex, ResourceId};
pub use pipeline::{
    CompareOp, ComputePipelineDesc, CullMode, GraphicsPipelineDesc, HotReloadablePipeline, PipelineHandle, PrimitiveTopology,
    RootSignature, ShaderWatch,
};
pub use queue::{Fence, FramePacing, Queue, QueueKind, FRAMES_IN_FLIGHT};
pub use resource::{
    AccelStructureKind, AccelerationStructure, Buffer, BufferDesc, BufferUsage, CubeMap, Format, ResourceState, Texture,
    TextureDesc, TextureUsage,
};
pub use shader::{ShaderBytecode, ShaderStage, SHADER_ENTRY_POINT};
pub use swapchain::Swapchain;
pub use uploader::{MipUpload, UploadOp, Uploader};
