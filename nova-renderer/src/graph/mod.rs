//! Fixed-order pass composition. Rather than topologically sorting nodes by
//! declared resource edges, this graph never infers ordering: barrier costs
//! stay visible in pass code instead of being computed from a dependency
//! graph, so passes run in exactly the sequence they are pushed in.

use nova_rhi::vulkan::{Device, TextureHandles};
use nova_rhi::{Barrier, CommandBuffer, CommandEncoder, DescriptorIndex, Format, ResourceState, Texture, TextureDesc, TextureUsage};

use crate::config::RendererConfig;
use crate::error::PassResult;
use crate::scene::{Camera, Scene};

/// One GPU texture this crate owns end to end: the `nova_rhi::Texture`
/// bookkeeping plus its native Vulkan handles, recreated wholesale on resize.
pub struct OwnedTexture {
    pub texture: Texture,
    pub handles: TextureHandles,
}

impl OwnedTexture {
    pub fn create(device: &Device, desc: TextureDesc) -> PassResult<Self> {
        let (texture, handles) = device.create_texture(desc)?;
        Ok(Self { texture, handles })
    }

    /// Bind mip 0's sampled-image view, returning the heap index a pass
    /// pushes into its bindless push constants.
    pub fn srv(&mut self, device: &Device) -> PassResult<DescriptorIndex> {
        Ok(device.bind_sampled_texture(&mut self.texture, &self.handles, 0)?)
    }

    /// Bind mip 0's storage-image view, the UAV counterpart of `srv`.
    pub fn uav(&mut self, device: &Device) -> PassResult<DescriptorIndex> {
        Ok(device.bind_storage_texture(&mut self.texture, &self.handles, 0)?)
    }

    /// Mip 0's already-bound sampled-image heap index. Every `FrameTargets`
    /// field is bound at construction, so passes can rely on this being
    /// populated rather than re-checking `Option` each frame.
    pub fn srv_index(&self) -> u32 {
        self.texture.srv_indices[0].expect("FrameTargets binds SRVs at construction").0
    }

    pub fn uav_index(&self) -> u32 {
        self.texture.uav_indices[0].expect("FrameTargets binds UAVs at construction").0
    }
}

/// Every shared texture the fixed pass order reads from or writes to. Each
/// pass only touches the fields it's documented to own; nothing here is
/// inferred automatically, matching § 4.2's "no dependency graph" rule.
pub struct FrameTargets {
    pub gbuffer_albedo: OwnedTexture,
    pub gbuffer_normal: OwnedTexture,
    pub gbuffer_pbr: OwnedTexture,
    pub gbuffer_velocity: OwnedTexture,
    pub depth: OwnedTexture,
    pub shadow_map: OwnedTexture,
    pub hdr_color: OwnedTexture,
    pub ldr_color: OwnedTexture,
    pub luminance: OwnedTexture,
    pub histogram: nova_rhi::Buffer,
    pub histogram_handles: nova_rhi::vulkan::BufferHandles,
}

impl FrameTargets {
    pub fn create(device: &Device, width: u32, height: u32, shadow_resolution: u32) -> PassResult<Self> {
        let color_target = |label: &'static str, format: Format| -> PassResult<OwnedTexture> {
            OwnedTexture::create(
                device,
                TextureDesc {
                    width,
                    height,
                    mip_count: 1,
                    format,
                    usage: TextureUsage::RENDER_TARGET | TextureUsage::SAMPLED | TextureUsage::STORAGE,
                    label: Some(label.to_string()),
                },
            )
        };

        let mut gbuffer_albedo = color_target("gbuffer_albedo", Format::Rgba8Unorm)?;
        let mut gbuffer_normal = color_target("gbuffer_normal", Format::Rgba16Float)?;
        let mut gbuffer_pbr = color_target("gbuffer_pbr", Format::Rgba8Unorm)?;
        let mut gbuffer_velocity = color_target("gbuffer_velocity", Format::Rgba16Float)?;
        gbuffer_albedo.srv(device)?;
        gbuffer_normal.srv(device)?;
        gbuffer_pbr.srv(device)?;
        gbuffer_velocity.srv(device)?;
        let mut depth = OwnedTexture::create(
            device,
            TextureDesc {
                width,
                height,
                mip_count: 1,
                format: Format::D32Float,
                usage: TextureUsage::DEPTH_STENCIL | TextureUsage::SAMPLED,
                label: Some("depth".to_string()),
            },
        )?;
        depth.srv(device)?;
        let mut shadow_map = OwnedTexture::create(
            device,
            TextureDesc {
                width: shadow_resolution,
                height: shadow_resolution,
                mip_count: 1,
                format: Format::D32Float,
                usage: TextureUsage::DEPTH_STENCIL | TextureUsage::SAMPLED,
                label: Some("shadow_map".to_string()),
            },
        )?;
        shadow_map.srv(device)?;
        let mut hdr_color = color_target("hdr_color", Format::Rgba16Float)?;
        hdr_color.srv(device)?;
        hdr_color.uav(device)?;
        let mut ldr_color = color_target("ldr_color", Format::Rgba8Unorm)?;
        ldr_color.srv(device)?;
        ldr_color.uav(device)?;
        let mut luminance = OwnedTexture::create(
            device,
            TextureDesc {
                width: 1,
                height: 1,
                mip_count: 1,
                format: Format::R32Float,
                usage: TextureUsage::STORAGE | TextureUsage::SAMPLED,
                label: Some("auto_exposure_luminance".to_string()),
            },
        )?;
        luminance.srv(device)?;
        luminance.uav(device)?;
        let (mut histogram, histogram_handles) = device.create_buffer(nova_rhi::BufferDesc {
            size: 256 * std::mem::size_of::<u32>() as u64,
            usage: nova_rhi::BufferUsage::STORAGE | nova_rhi::BufferUsage::COPY_DST,
            host_visible: false,
            label: Some("auto_exposure_histogram".to_string()),
        })?;
        device.bind_storage_buffer(&mut histogram, &histogram_handles)?;

        Ok(Self {
            gbuffer_albedo,
            gbuffer_normal,
            gbuffer_pbr,
            gbuffer_velocity,
            depth,
            shadow_map,
            hdr_color,
            ldr_color,
            luminance,
            histogram,
            histogram_handles,
        })
    }

    pub fn histogram_index(&self) -> u32 {
        self.histogram.descriptor_index.expect("histogram bound at construction").0
    }

    /// Reallocate every target at the new swap-chain size. `Self::create`
    /// rebuilds `shadow_map`/`luminance`/`histogram` too even though their
    /// size doesn't depend on `width`/`height` -- simpler than threading a
    /// "keep these" exception list through, and resizes are rare enough that
    /// the extra allocation doesn't matter. The previous generation's
    /// textures are destroyed after the new ones are bound, freeing their
    /// bindless SRV/UAV slots and the histogram buffer's storage-buffer slot
    /// back to the heap.
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) -> PassResult<()> {
        let rebuilt = Self::create(device, width, height, self.shadow_map.texture.desc.width)?;
        let old = std::mem::replace(self, rebuilt);
        device.destroy_texture(&old.gbuffer_albedo.texture, old.gbuffer_albedo.handles);
        device.destroy_texture(&old.gbuffer_normal.texture, old.gbuffer_normal.handles);
        device.destroy_texture(&old.gbuffer_pbr.texture, old.gbuffer_pbr.handles);
        device.destroy_texture(&old.gbuffer_velocity.texture, old.gbuffer_velocity.handles);
        device.destroy_texture(&old.depth.texture, old.depth.handles);
        device.destroy_texture(&old.shadow_map.texture, old.shadow_map.handles);
        device.destroy_texture(&old.hdr_color.texture, old.hdr_color.handles);
        device.destroy_texture(&old.ldr_color.texture, old.ldr_color.handles);
        device.destroy_texture(&old.luminance.texture, old.luminance.handles);
        device.destroy_buffer(&old.histogram, old.histogram_handles);
        Ok(())
    }
}

/// Declarative UI control a pass exposes for an inspector overlay -- the
/// immediate-mode widget rendering itself is out of scope (ImGui
/// integration), so this is just the data a host UI would draw from.
#[derive(Debug, Clone)]
pub enum UiControl {
    Checkbox { label: &'static str, value: bool },
    Slider { label: &'static str, value: f32, min: f32, max: f32 },
}

pub struct PassContext<'a> {
    pub encoder: &'a mut CommandEncoder,
    pub targets: &'a mut FrameTargets,
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub config: &'a RendererConfig,
    pub width: u32,
    pub height: u32,
    pub dt: f32,
    pub frame_index: u64,
}

/// The contract every pass in the fixed order implements, per § 4.5: record,
/// resize owned textures, describe an inspector panel, and poll/rebuild its
/// hot-reloadable pipeline.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()>;
    fn resize(&mut self, device: &Device, width: u32, height: u32) -> PassResult<()>;
    fn ui(&self) -> Vec<UiControl>;
    fn reconstruct(&mut self, device: &Device) -> PassResult<()>;
}

/// Helper every pass uses to emit its entry/exit barriers explicitly, since
/// this RHI never infers them.
pub fn transition(encoder: &mut CommandEncoder, texture: &mut Texture, mip: u32, after: ResourceState) {
    let before = texture.mip_states[mip as usize];
    if before == after {
        return;
    }
    encoder.barrier(vec![Barrier::mip(texture.id, mip, before, after)]);
    texture.mip_states[mip as usize] = after;
}

/// The fixed composition order: Shadows -> Deferred -> Environment-map sky ->
/// Color correction -> Auto-exposure -> Tonemapping -> Debug overlay ->
/// Present. A plain `Vec<Box<dyn Pass>>` driven front to back -- no
/// topological sort, no edge list.
pub struct FrameGraph {
    targets: FrameTargets,
    passes: Vec<Box<dyn Pass>>,
}

impl FrameGraph {
    pub fn new(targets: FrameTargets, passes: Vec<Box<dyn Pass>>) -> Self {
        Self { targets, passes }
    }

    pub fn targets(&self) -> &FrameTargets {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut FrameTargets {
        &mut self.targets
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) -> PassResult<()> {
        self.targets.resize(device, width, height)?;
        for pass in &mut self.passes {
            pass.resize(device, width, height)?;
        }
        Ok(())
    }

    pub fn reconstruct(&mut self, device: &Device) -> PassResult<()> {
        for pass in &mut self.passes {
            pass.reconstruct(device)?;
        }
        Ok(())
    }

    pub fn render_frame(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        config: &RendererConfig,
        width: u32,
        height: u32,
        dt: f32,
        frame_index: u64,
    ) -> PassResult<CommandBuffer> {
        let mut encoder = CommandEncoder::new();
        for pass in &mut self.passes {
            let mut ctx = PassContext {
                encoder: &mut encoder,
                targets: &mut self.targets,
                scene,
                camera,
                config,
                width,
                height,
                dt,
                frame_index,
            };
            pass.render(&mut ctx)?;
        }
        Ok(encoder.finish())
    }

    pub fn ui(&self) -> Vec<(&'static str, Vec<UiControl>)> {
        self.passes.iter().map(|p| (p.name(), p.ui())).collect()
    }
}
