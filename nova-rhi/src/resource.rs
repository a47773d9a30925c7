use bitflags::bitflags;

use crate::ids::{DescriptorIndex, ResourceId};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        const VERTEX        = 1 << 0;
        const INDEX         = 1 << 1;
        const UNIFORM       = 1 << 2;
        const STORAGE       = 1 << 3;
        const COPY_SRC      = 1 << 4;
        const COPY_DST      = 1 << 5;
        const INDIRECT      = 1 << 6;
        const ACCEL_STORAGE = 1 << 7;
        const ACCEL_SCRATCH = 1 << 8;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureUsage: u32 {
        const SAMPLED          = 1 << 0;
        const STORAGE          = 1 << 1;
        const RENDER_TARGET    = 1 << 2;
        const DEPTH_STENCIL    = 1 << 3;
        const COPY_SRC         = 1 << 4;
        const COPY_DST         = 1 << 5;
    }
}

/// The state a resource (or one subresource of it) is currently in, tracked
/// explicitly per spec so that barrier batching can compute minimal
/// before/after transitions rather than inserting a full pipeline barrier
/// around every access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Undefined,
    CopySrc,
    CopyDst,
    VertexBuffer,
    IndexBuffer,
    UniformRead,
    ShaderRead,
    ShaderReadWrite,
    RenderTarget,
    DepthWrite,
    DepthRead,
    Present,
    AccelStructureBuild,
    AccelStructureRead,
}

#[derive(Debug, Clone, Copy)]
pub enum Format {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    D32Float,
    Bc1Unorm,
    Bc7Unorm,
}

#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
    pub host_visible: bool,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    pub format: Format,
    pub usage: TextureUsage,
    pub label: Option<String>,
}

/// A GPU buffer. `descriptor_index` is populated lazily the first time the
/// buffer is bound bindlessly (via `Device::bind_storage_buffer`/
/// `bind_uniform_buffer`); a buffer that is only ever used as a vertex/index
/// buffer never receives one.
#[derive(Debug)]
pub struct Buffer {
    pub id: ResourceId,
    pub desc: BufferDesc,
    pub state: ResourceState,
    pub descriptor_index: Option<DescriptorIndex>,
}

/// A 2D texture with an explicit per-mip resource-state vector, since
/// different mips can legitimately be in different states at once (e.g. mip 0
/// still being written by a compute pass while mip 3 is already being sampled
/// by a previous frame in flight). `srv_indices`/`uav_indices` are likewise
/// per-mip, since a mip chain's base level is often bound as a storage image
/// for a compute pass while a higher mip is still bound as a sampled view
/// elsewhere.
#[derive(Debug)]
pub struct Texture {
    pub id: ResourceId,
    pub desc: TextureDesc,
    pub mip_states: Vec<ResourceState>,
    pub srv_indices: Vec<Option<DescriptorIndex>>,
    pub uav_indices: Vec<Option<DescriptorIndex>>,
    pub rtv_index: Option<DescriptorIndex>,
    pub dsv_index: Option<DescriptorIndex>,
}

impl Texture {
    pub fn new(id: ResourceId, desc: TextureDesc) -> Self {
        let mip_count = desc.mip_count.max(1) as usize;
        Self {
            id,
            desc,
            mip_states: vec![ResourceState::Undefined; mip_count],
            srv_indices: vec![None; mip_count],
            uav_indices: vec![None; mip_count],
            rtv_index: None,
            dsv_index: None,
        }
    }

    pub fn mip_count(&self) -> u32 {
        self.mip_states.len() as u32
    }
}

/// Six-face cube map, modeled as six independent per-mip state vectors rather
/// than a single flat array, so a pass that only updates one face (e.g.
/// irradiance convolution writing face-by-face) doesn't force every other
/// face through the same barrier. Unlike per-face state, the bindless views
/// are per-mip only (one cubemap SRV/UAV per mip spans all six faces).
#[derive(Debug)]
pub struct CubeMap {
    pub id: ResourceId,
    pub desc: TextureDesc,
    pub face_mip_states: [Vec<ResourceState>; 6],
    pub srv_indices: Vec<Option<DescriptorIndex>>,
    pub uav_indices: Vec<Option<DescriptorIndex>>,
}

impl CubeMap {
    pub fn new(id: ResourceId, desc: TextureDesc) -> Self {
        let mip_count = desc.mip_count.max(1) as usize;
        let faces = std::array::from_fn(|_| vec![ResourceState::Undefined; mip_count]);
        Self {
            id,
            desc,
            face_mip_states: faces,
            srv_indices: vec![None; mip_count],
            uav_indices: vec![None; mip_count],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelStructureKind {
    Blas,
    Tlas,
}

/// A bottom- or top-level acceleration structure. `Tlas` is the only resource
/// kind in this RHI bound through a dedicated root-signature slot rather than
/// the bindless heap (see `RootSignature`), since it is read by exactly one
/// shader stage (the raytracing pipeline) per frame.
#[derive(Debug)]
pub struct AccelerationStructure {
    pub id: ResourceId,
    pub kind: AccelStructureKind,
    pub backing: Buffer,
    pub scratch: Buffer,
    pub state: ResourceState,
}
