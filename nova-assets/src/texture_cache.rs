use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{CacheError, CacheResult};
use crate::hash::{cache_filename, normalize_path};
use crate::texture::bc::{compress_bc1, compress_bc7, BC1_BLOCK_BYTES, BC7_BLOCK_BYTES};
use crate::texture::mip::{build_chain, MipLevel};

pub const HEADER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureCacheMode {
    Bc1 = 1,
    Bc7 = 7,
}

impl TextureCacheMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(TextureCacheMode::Bc1),
            7 => Some(TextureCacheMode::Bc7),
            _ => None,
        }
    }

    pub fn block_size(self) -> u32 {
        match self {
            TextureCacheMode::Bc1 => 8,
            TextureCacheMode::Bc7 => 16,
        }
    }
}

/// `.cache/textures/<hash>.oni` header; field layout fixed by the external
/// interfaces contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFileHeader {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    pub mode: u32,
}

impl TextureFileHeader {
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.width.to_le_bytes());
        out[4..8].copy_from_slice(&self.height.to_le_bytes());
        out[8..12].copy_from_slice(&self.mip_count.to_le_bytes());
        out[12..16].copy_from_slice(&self.mode.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CacheResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CacheError::CorruptCache {
                path: String::new(),
                reason: format!("header truncated: {} bytes", bytes.len()),
            });
        }
        Ok(Self {
            width: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            height: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            mip_count: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            mode: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        })
    }
}

/// `block_size(mode) * ceil(max(1, width>>mip) / 4) * ceil(max(1, height>>mip) / 4)`,
/// exactly as specified.
pub fn mip_byte_size(mode: TextureCacheMode, width: u32, height: u32, mip: u32) -> u64 {
    let w = (width >> mip).max(1);
    let h = (height >> mip).max(1);
    let blocks_x = (w + 3) / 4;
    let blocks_y = (h + 3) / 4;
    mode.block_size() as u64 * blocks_x as u64 * blocks_y as u64
}

/// Boundary for the GPU/CUDA compression path; this crate only ships the CPU
/// fallback (`CpuBc1Bc7Compressor`), matching the original's documented
/// CUDA-path/CPU-fallback split.
pub trait TextureCompressorBackend {
    fn compress(&self, rgba: &MipLevel, mode: TextureCacheMode) -> Vec<u8>;
}

pub struct CpuBc1Bc7Compressor;

impl TextureCompressorBackend for CpuBc1Bc7Compressor {
    fn compress(&self, level: &MipLevel, mode: TextureCacheMode) -> Vec<u8> {
        let blocks_x = ((level.width + 3) / 4).max(1);
        let blocks_y = ((level.height + 3) / 4).max(1);
        let block_bytes = mode.block_size() as usize;
        let mut out = vec![0u8; blocks_x as usize * blocks_y as usize * block_bytes];

        for by in 0..blocks_y {
            for bx in 0..blocks_x {
                let mut block = [0u8; 64];
                for oy in 0..4u32 {
                    for ox in 0..4u32 {
                        let sx = (bx * 4 + ox).min(level.width - 1);
                        let sy = (by * 4 + oy).min(level.height - 1);
                        let src = ((sy * level.width + sx) * 4) as usize;
                        let dst = ((oy * 4 + ox) * 4) as usize;
                        block[dst..dst + 4].copy_from_slice(&level.rgba[src..src + 4]);
                    }
                }
                let out_offset = (by * blocks_x + bx) as usize * block_bytes;
                match mode {
                    TextureCacheMode::Bc1 => {
                        let encoded = compress_bc1(&block);
                        debug_assert_eq!(encoded.len(), BC1_BLOCK_BYTES);
                        out[out_offset..out_offset + block_bytes].copy_from_slice(&encoded);
                    }
                    TextureCacheMode::Bc7 => {
                        let encoded = compress_bc7(&block);
                        debug_assert_eq!(encoded.len(), BC7_BLOCK_BYTES);
                        out[out_offset..out_offset + block_bytes].copy_from_slice(&encoded);
                    }
                }
            }
        }
        out
    }
}

pub struct TextureCache {
    cache_dir: PathBuf,
}

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

impl TextureCache {
    pub fn new(cache_root: impl Into<PathBuf>) -> CacheResult<Self> {
        let cache_dir = cache_root.into().join("textures");
        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::FileIo {
            path: cache_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { cache_dir })
    }

    pub fn cached_path(&self, source_path: &str) -> PathBuf {
        self.cache_dir.join(cache_filename(&normalize_path(source_path)))
    }

    pub fn exists_in_cache(&self, source_path: &str) -> bool {
        self.cached_path(source_path).is_file()
    }

    /// Compress `level0` (already decoded to RGBA8) into a full mip chain
    /// and write it under the cache. Unlike the shader cache, this never
    /// checks a source timestamp -- call sites must check `exists_in_cache`
    /// themselves before calling this, since the cache treats "present" as
    /// "valid forever" by design.
    pub fn cache_texture(
        &self,
        source_path: &str,
        level0: MipLevel,
        mode: TextureCacheMode,
        compressor: &dyn TextureCompressorBackend,
    ) {
        let width = level0.width;
        let height = level0.height;
        let chain = build_chain(level0);
        let mip_count = chain.len() as u32;

        let header = TextureFileHeader {
            width,
            height,
            mip_count,
            mode: mode as u32,
        };
        let mut out = Vec::new();
        out.extend_from_slice(&header.to_bytes());
        for level in &chain {
            out.extend_from_slice(&compressor.compress(level, mode));
        }

        let path = self.cached_path(source_path);
        if let Err(e) = fs::write(&path, &out) {
            warn!("failed to write texture cache file {}: {e}", path.display());
        } else {
            info!("cached texture {source_path} in {}", path.display());
        }
    }

    pub fn read_header(&self, source_path: &str) -> CacheResult<TextureFileHeader> {
        let path = self.cached_path(source_path);
        let bytes = fs::read(&path).map_err(|e| CacheError::FileIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        TextureFileHeader::from_bytes(&bytes)
    }

    /// Read back the header and the raw (still block-compressed) mip chain
    /// bytes, validating that the file is exactly as long as the header's
    /// `mip_count`/`mode`/`width`/`height` predict.
    pub fn read_compressed(&self, source_path: &str) -> CacheResult<(TextureFileHeader, Vec<u8>)> {
        let path = self.cached_path(source_path);
        let bytes = fs::read(&path).map_err(|e| CacheError::FileIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let header = TextureFileHeader::from_bytes(&bytes)?;
        let mode = TextureCacheMode::from_u32(header.mode).ok_or_else(|| CacheError::CorruptCache {
            path: path.display().to_string(),
            reason: format!("unknown texture mode {}", header.mode),
        })?;
        let mut expected = HEADER_SIZE as u64;
        for mip in 0..header.mip_count {
            expected += mip_byte_size(mode, header.width, header.height, mip);
        }
        if (bytes.len() as u64) < expected {
            return Err(CacheError::CorruptCache {
                path: path.display().to_string(),
                reason: format!("expected {expected} bytes, found {}", bytes.len()),
            });
        }
        Ok((header, bytes[HEADER_SIZE..expected as usize].to_vec()))
    }

    pub fn traverse_directory(
        &self,
        textures_root: &Path,
        mode: TextureCacheMode,
        compressor: &dyn TextureCompressorBackend,
        decode: impl Fn(&Path) -> CacheResult<MipLevel>,
    ) -> CacheResult<()> {
        for entry in walk_files(textures_root)? {
            let Some(ext) = entry.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                continue;
            }
            let normalized = normalize_path(&entry.to_string_lossy());
            if self.exists_in_cache(&normalized) {
                info!("{normalized} already cached — skipping (textures are never timestamp-invalidated)");
                continue;
            }
            match decode(&entry) {
                Ok(level0) => self.cache_texture(&normalized, level0, mode, compressor),
                Err(e) => warn!("failed to load texture {normalized}: {e}"),
            }
        }
        Ok(())
    }
}

fn walk_files(root: &Path) -> CacheResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| CacheError::FileIo {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::FileIo {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_byte_size_matches_formula_for_bc7() {
        // scenario 3: 256x256 BC7, sum over mips 0..=8 of 16 * ceil(256>>i / 4)^2
        let expected: u64 = (0..9)
            .map(|i| mip_byte_size(TextureCacheMode::Bc7, 256, 256, i))
            .sum();
        let manual: u64 = (0..9u32)
            .map(|i| {
                let size = (256u32 >> i).max(1);
                let blocks = ((size + 3) / 4) as u64;
                16 * blocks * blocks
            })
            .sum();
        assert_eq!(expected, manual);
    }

    #[test]
    fn header_round_trips() {
        let header = TextureFileHeader { width: 256, height: 256, mip_count: 9, mode: 7 };
        assert_eq!(TextureFileHeader::from_bytes(&header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn cache_then_read_round_trips_header_and_payload_length() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TextureCache::new(dir.path()).unwrap();
        let level0 = MipLevel {
            width: 8,
            height: 8,
            rgba: vec![128u8; 8 * 8 * 4],
        };
        cache.cache_texture("assets/t.png", level0, TextureCacheMode::Bc7, &CpuBc1Bc7Compressor);
        let (header, payload) = cache.read_compressed("assets/t.png").unwrap();
        assert_eq!(header.width, 8);
        assert_eq!(header.mode, 7);
        let expected_len: u64 = (0..header.mip_count)
            .map(|i| mip_byte_size(TextureCacheMode::Bc7, 8, 8, i))
            .sum();
        assert_eq!(payload.len() as u64, expected_len);
    }

    #[test]
    fn cache_is_not_invalidated_by_rewriting_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TextureCache::new(dir.path()).unwrap();
        let level0 = MipLevel { width: 4, height: 4, rgba: vec![0u8; 4 * 4 * 4] };
        cache.cache_texture("assets/t.png", level0, TextureCacheMode::Bc1, &CpuBc1Bc7Compressor);
        assert!(cache.exists_in_cache("assets/t.png"));
        // No API on `TextureCache` accepts a "current timestamp" at all --
        // presence alone governs reuse.
    }
}
