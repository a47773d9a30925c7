//! Backend-agnostic wiring demo: constructs a `nova_rhi::vulkan::Device`, a
//! `nova_renderer::Renderer` over it, and drives a handful of frames through
//! a `HeadlessWindow`. No real OS window or swap chain is involved -- this
//! demonstrates the frame-graph wiring, not presentation, matching the
//! windowing shell's out-of-scope status.

use nova_app::{HeadlessWindow, Window};
use nova_renderer::{Camera, RendererConfig, Scene};
use nova_rhi::vulkan::{Device, RhiConfig};

fn main() {
    env_logger::init();

    let device = match Device::new(RhiConfig::default()) {
        Ok(device) => device,
        Err(err) => {
            log::error!("device creation failed: {err}");
            return;
        }
    };

    let mut window = HeadlessWindow::new(1920, 1080);
    let config = RendererConfig::default();
    let (width, height) = window.size();

    let mut renderer = match nova_renderer::Renderer::new(&device, ".cache", width, height, &config) {
        Ok(renderer) => renderer,
        Err(err) => {
            log::error!("renderer creation failed: {err}");
            return;
        }
    };

    let scene = Scene::default();
    let mut camera = Camera::new();

    let mut frame_index = 0u64;
    while window.is_open() && frame_index < 60 {
        window.poll_events();

        if let Err(err) = renderer.reconstruct(&device) {
            log::warn!("pipeline reconstruct failed on frame {frame_index}: {err}");
        }

        let (width, height) = window.size();
        camera.begin_frame(width, height, config.taa_enabled);

        let dt = 1.0 / 60.0;
        match renderer.render_frame(&scene, &camera, &config, width, height, dt, frame_index) {
            Ok(command_buffer) => {
                if let Err(err) = device.submit_frame(command_buffer, 1_000_000_000) {
                    log::error!("submit_frame failed on frame {frame_index}: {err}");
                    break;
                }
            }
            Err(err) => {
                log::error!("render_frame failed on frame {frame_index}: {err}");
                break;
            }
        }

        frame_index += 1;
    }

    log::info!("rendered {frame_index} frames");
}
