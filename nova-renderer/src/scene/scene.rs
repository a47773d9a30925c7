use nova_rhi::DescriptorIndex;
use nova_rhi::ResourceId;

/// Bindless material indices a draw item carries into its push constants,
/// grounded in `src/renderer/scene.cpp`'s per-draw material block. Kept
/// minimal since the glTF frontend that actually populates materials is out
/// of scope here.
#[derive(Debug, Clone, Copy)]
pub struct MaterialIndices {
    pub albedo: DescriptorIndex,
    pub normal: DescriptorIndex,
    pub metallic_roughness: DescriptorIndex,
    pub emissive: DescriptorIndex,
}

impl Default for MaterialIndices {
    fn default() -> Self {
        Self {
            albedo: DescriptorIndex::INVALID,
            normal: DescriptorIndex::INVALID,
            metallic_roughness: DescriptorIndex::INVALID,
            emissive: DescriptorIndex::INVALID,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub vertex_buffer: ResourceId,
    pub index_buffer: ResourceId,
    pub index_count: u32,
    pub transform: [f32; 16],
    pub material: MaterialIndices,
}

/// A per-frame line-list vertex buffer for debug/AABB/motion overlays --
/// the reduced line-list contract from `debug_renderer.cpp`. Each vertex is
/// position (12 bytes) + color (12 bytes); `vertex_count` must be a multiple
/// of 2.
#[derive(Debug, Clone, Copy)]
pub struct DebugLineBuffer {
    pub vertex_buffer: ResourceId,
    pub vertex_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: [0.0, -1.0, 0.0],
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

/// The boundary contract passes read from each frame: everything the
/// out-of-scope glTF frontend would otherwise populate. Kept deliberately
/// thin -- a list of draw items, one directional light, one optional
/// environment cubemap -- since scene authoring itself is not this crate's
/// concern. `environment_cubemap` is the cubemap's already-bound bindless SRV
/// index, not its `ResourceId`: by the time a `Scene` reaches the frame
/// graph, whatever loaded the asset has already bound it into the heap.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub draw_items: Vec<DrawItem>,
    pub directional_light: DirectionalLight,
    pub environment_cubemap: Option<DescriptorIndex>,
    pub debug_lines: Option<DebugLineBuffer>,
}
