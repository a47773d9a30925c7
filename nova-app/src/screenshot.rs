//! Screenshot path contract: a PNG written to
//! `screenshots/engine/Screenshot <ctime>.png`, with colons in the timestamp
//! replaced by underscores. Content is the tonemapped LDR output at native
//! resolution, RGBA8. PNG encoding itself is delegated to the `image` crate
//! rather than hand-rolled, per this crate's ambient stack.

use std::path::PathBuf;

use chrono::Local;
use image::{ImageBuffer, Rgba};

use crate::error::{AppError, AppResult};

/// `pixels` must be `width * height * 4` bytes of RGBA8, row-major, top-left
/// origin -- the layout `copy_texture_to_buffer` leaves a host-visible buffer
/// in after reading back `ldr_color`.
pub fn write_screenshot(pixels: &[u8], width: u32, height: u32) -> AppResult<PathBuf> {
    let dir = PathBuf::from("screenshots").join("engine");
    std::fs::create_dir_all(&dir).map_err(|e| AppError::Screenshot {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let ctime = Local::now().format("%a %b %d %H:%M:%S %Y").to_string().replace(':', "_");
    let path = dir.join(format!("Screenshot {ctime}.png"));

    let buffer: ImageBuffer<Rgba<u8>, _> = ImageBuffer::from_raw(width, height, pixels.to_vec()).ok_or_else(|| AppError::Screenshot {
        path: path.display().to_string(),
        reason: format!("pixel buffer length {} doesn't match {width}x{height} RGBA8", pixels.len()),
    })?;

    buffer.save(&path).map_err(|e| AppError::Screenshot {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer_length() {
        let pixels = vec![0u8; 4];
        let err = write_screenshot(&pixels, 4, 4).unwrap_err();
        assert!(matches!(err, AppError::Screenshot { .. }));
    }
}
