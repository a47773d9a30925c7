use crate::ids::ResourceId;
use crate::pipeline::PipelineHandle;
use crate::resource::ResourceState;

/// One subresource transition. Passes declare these explicitly; nothing in
/// this crate infers a barrier from a render-graph dependency edge.
#[derive(Debug, Clone, Copy)]
pub struct Barrier {
    pub resource: ResourceId,
    pub mip: Option<u32>,
    pub face: Option<u32>,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl Barrier {
    pub fn whole_resource(resource: ResourceId, before: ResourceState, after: ResourceState) -> Self {
        Self {
            resource,
            mip: None,
            face: None,
            before,
            after,
        }
    }

    pub fn mip(resource: ResourceId, mip: u32, before: ResourceState, after: ResourceState) -> Self {
        Self {
            resource,
            mip: Some(mip),
            face: None,
            before,
            after,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferCopy {
    pub src: ResourceId,
    pub dst: ResourceId,
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// One recorded operation. A `CommandBuffer` is just a `Vec<Command>`; the
/// vulkan backend walks it at submit time and emits the matching `ash` calls.
/// Keeping the recorded form backend-agnostic means barrier-batching logic
/// can be exercised in tests without a real device.
#[derive(Debug, Clone)]
pub enum Command {
    PipelineBarrier(Vec<Barrier>),
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindPipeline(PipelineHandle),
    PushConstants { offset: u32, bytes: Vec<u8> },
    BeginRenderPass { color_targets: Vec<ResourceId>, depth_target: Option<ResourceId> },
    EndRenderPass,
    Draw { vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32 },
    DrawIndexed { index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32 },
    BindVertexBuffer { buffer: ResourceId, offset: u64 },
    BindIndexBuffer { buffer: ResourceId, offset: u64 },
    Dispatch { x: u32, y: u32, z: u32 },
    CopyBuffer(BufferCopy),
    CopyTextureToTexture { src: ResourceId, dst: ResourceId },
    CopyBufferToTexture { src: ResourceId, dst: ResourceId, mip: u32 },
    CopyTextureToBuffer { src: ResourceId, dst: ResourceId, mip: u32 },
    ClearRenderTarget { target: ResourceId, color: [f32; 4] },
    ClearDepthTarget { target: ResourceId, depth: f32 },
    ClearUav { target: ResourceId, value: [u32; 4] },
    SetTopology(crate::pipeline::PrimitiveTopology),
    BeginEvent(String),
    EndEvent,
    InsertMarker(String),
}

/// Records a linear sequence of `Command`s for a single queue submission.
/// An encoder is the recording handle; `finish()` yields the immutable
/// buffer that `Queue::submit` consumes.
#[derive(Debug, Default)]
pub struct CommandEncoder {
    commands: Vec<Command>,
}

impl CommandEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn barrier(&mut self, barriers: impl Into<Vec<Barrier>>) -> &mut Self {
        let batch = barriers.into();
        if !batch.is_empty() {
            self.commands.push(Command::PipelineBarrier(batch));
        }
        self
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> &mut Self {
        self.commands.push(Command::SetViewport(viewport));
        self
    }

    pub fn set_scissor(&mut self, rect: Rect2D) -> &mut Self {
        self.commands.push(Command::SetScissor(rect));
        self
    }

    pub fn bind_pipeline(&mut self, pipeline: PipelineHandle) -> &mut Self {
        self.commands.push(Command::BindPipeline(pipeline));
        self
    }

    pub fn push_constants(&mut self, offset: u32, bytes: &[u8]) -> &mut Self {
        self.commands.push(Command::PushConstants {
            offset,
            bytes: bytes.to_vec(),
        });
        self
    }

    pub fn begin_render_pass(&mut self, color_targets: Vec<ResourceId>, depth_target: Option<ResourceId>) -> &mut Self {
        self.commands.push(Command::BeginRenderPass { color_targets, depth_target });
        self
    }

    pub fn end_render_pass(&mut self) -> &mut Self {
        self.commands.push(Command::EndRenderPass);
        self
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> &mut Self {
        self.commands.push(Command::Draw { vertex_count, instance_count, first_vertex, first_instance });
        self
    }

    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32) -> &mut Self {
        self.commands.push(Command::DrawIndexed { index_count, instance_count, first_index, vertex_offset, first_instance });
        self
    }

    pub fn bind_vertex_buffer(&mut self, buffer: ResourceId, offset: u64) -> &mut Self {
        self.commands.push(Command::BindVertexBuffer { buffer, offset });
        self
    }

    pub fn bind_index_buffer(&mut self, buffer: ResourceId, offset: u64) -> &mut Self {
        self.commands.push(Command::BindIndexBuffer { buffer, offset });
        self
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> &mut Self {
        self.commands.push(Command::Dispatch { x, y, z });
        self
    }

    pub fn copy_buffer(&mut self, copy: BufferCopy) -> &mut Self {
        self.commands.push(Command::CopyBuffer(copy));
        self
    }

    pub fn copy_buffer_to_texture(&mut self, src: ResourceId, dst: ResourceId, mip: u32) -> &mut Self {
        self.commands.push(Command::CopyBufferToTexture { src, dst, mip });
        self
    }

    pub fn copy_texture_to_texture(&mut self, src: ResourceId, dst: ResourceId) -> &mut Self {
        self.commands.push(Command::CopyTextureToTexture { src, dst });
        self
    }

    /// Full-subresource readback of `mip` into `dst`, the command the
    /// screenshot path contract uses to pull the tonemapped LDR target into a
    /// host-visible buffer.
    pub fn copy_texture_to_buffer(&mut self, src: ResourceId, dst: ResourceId, mip: u32) -> &mut Self {
        self.commands.push(Command::CopyTextureToBuffer { src, dst, mip });
        self
    }

    pub fn clear_render_target(&mut self, target: ResourceId, color: [f32; 4]) -> &mut Self {
        self.commands.push(Command::ClearRenderTarget { target, color });
        self
    }

    pub fn clear_depth_target(&mut self, target: ResourceId, depth: f32) -> &mut Self {
        self.commands.push(Command::ClearDepthTarget { target, depth });
        self
    }

    pub fn clear_uav(&mut self, target: ResourceId, value: [u32; 4]) -> &mut Self {
        self.commands.push(Command::ClearUav { target, value });
        self
    }

    /// Dynamically overrides the bound pipeline's baked topology, for the
    /// rare pass (debug overlay) that switches between triangle and line
    /// lists without a pipeline swap. Ignored by the backend on devices
    /// without `VK_EXT_extended_dynamic_state`, in which case the pipeline's
    /// own baked topology applies.
    pub fn set_topology(&mut self, topology: crate::pipeline::PrimitiveTopology) -> &mut Self {
        self.commands.push(Command::SetTopology(topology));
        self
    }

    pub fn begin_event(&mut self, label: impl Into<String>) -> &mut Self {
        self.commands.push(Command::BeginEvent(label.into()));
        self
    }

    pub fn end_event(&mut self) -> &mut Self {
        self.commands.push(Command::EndEvent);
        self
    }

    pub fn insert_marker(&mut self, label: impl Into<String>) -> &mut Self {
        self.commands.push(Command::InsertMarker(label.into()));
        self
    }

    pub fn finish(self) -> CommandBuffer {
        CommandBuffer { commands: self.commands }
    }
}

#[derive(Debug, Default)]
pub struct CommandBuffer {
    pub(crate) commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;

    #[test]
    fn repeated_barriers_with_same_before_after_are_idempotent_in_effect() {
        let ids = IdAllocator::new();
        let resource = ids.next();
        let mut encoder = CommandEncoder::new();
        let b = Barrier::whole_resource(resource, ResourceState::ShaderRead, ResourceState::ShaderRead);
        encoder.barrier(vec![b]);
        encoder.barrier(vec![b]);
        let cmd = encoder.finish();
        assert_eq!(cmd.commands().len(), 2);
        for c in cmd.commands() {
            if let Command::PipelineBarrier(batch) = c {
                assert_eq!(batch[0].before, batch[0].after);
            } else {
                panic!("expected barrier command");
            }
        }
    }

    #[test]
    fn empty_barrier_batch_is_not_recorded() {
        let mut encoder = CommandEncoder::new();
        encoder.barrier(vec![]);
        assert!(encoder.finish().commands().is_empty());
    }
}
