//! Final step of the fixed composition: transitions `ldr_color` into a
//! copy-source state so the window-boundary layer can blit it to the
//! swapchain image. The swapchain itself is out of scope here (windowing
//! shell is not part of this crate) -- this pass only emits the barrier.

use nova_rhi::vulkan::Device;
use nova_rhi::ResourceState;

use crate::error::PassResult;
use crate::graph::{transition, Pass, PassContext, UiControl};

#[derive(Default)]
pub struct PresentPass;

impl PresentPass {
    pub fn new() -> Self {
        Self
    }
}

impl Pass for PresentPass {
    fn name(&self) -> &'static str {
        "present"
    }

    fn render(&mut self, ctx: &mut PassContext) -> PassResult<()> {
        transition(ctx.encoder, &mut ctx.targets.ldr_color.texture, 0, ResourceState::CopySrc);
        Ok(())
    }

    fn resize(&mut self, _device: &Device, _width: u32, _height: u32) -> PassResult<()> {
        Ok(())
    }

    fn ui(&self) -> Vec<UiControl> {
        Vec::new()
    }

    fn reconstruct(&mut self, _device: &Device) -> PassResult<()> {
        Ok(())
    }
}
