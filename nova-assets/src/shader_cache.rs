use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use nova_rhi::{ShaderBytecode, ShaderStage};

use crate::error::{CacheError, CacheResult};
use crate::hash::{cache_filename, normalize_path};

pub const HEADER_SIZE: usize = 16;

/// On-disk prefix of a cached shader file. Field layout and byte offsets are
/// fixed by the external-interfaces contract; renamed from the original's
/// `OniShaderHeader` but otherwise identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderCacheHeader {
    pub stage: u32,
    pub low_file_time: u32,
    pub high_file_time: u32,
    pub bytecode_u32_count: u32,
}

impl ShaderCacheHeader {
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.stage.to_le_bytes());
        out[4..8].copy_from_slice(&self.low_file_time.to_le_bytes());
        out[8..12].copy_from_slice(&self.high_file_time.to_le_bytes());
        out[12..16].copy_from_slice(&self.bytecode_u32_count.to_le_bytes());
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
            stage: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            low_file_time: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            high_file_time: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            bytecode_u32_count: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        })
    }
}

/// A (low, high) 32-bit split of a file's modification time, the same shape
/// Win32's `FILETIME` uses. Populated from `SystemTime` by the caller at
/// traversal time; this crate doesn't depend on a platform time API itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTime {
    pub low: u32,
    pub high: u32,
}

impl FileTime {
    pub fn from_unix_nanos(nanos: u128) -> Self {
        let ticks = nanos as u64;
        Self {
            low: (ticks & 0xFFFF_FFFF) as u32,
            high: (ticks >> 32) as u32,
        }
    }
}

/// Boundary for the platform shader compiler. This crate has no real DXC
/// integration (HLSL source/compilation is outside this spec's scope); it
/// ships `NullCompiler` so the cache-hit/cache-miss/invalidation state
/// machine is fully exercised without one, and documents where a real
/// DXC-backed implementation plugs in.
pub trait ShaderCompilerBackend {
    fn compile(&self, source_path: &Path, stage: ShaderStage) -> Result<ShaderBytecode, String>;
}

pub struct NullCompiler;

impl ShaderCompilerBackend for NullCompiler {
    fn compile(&self, source_path: &Path, _stage: ShaderStage) -> Result<ShaderBytecode, String> {
        Err(format!(
            "no shader compiler backend configured (would compile {})",
            source_path.display()
        ))
    }
}

/// Infers a shader stage from a file name the way the traversal does:
/// one absolute path is excluded outright (the shared compute header, which
/// is `#include`d rather than compiled standalone), then substring match on
/// `Vert`/`Frag`/`Compute`.
pub fn stage_from_path(normalized_path: &str) -> Option<ShaderStage> {
    if normalized_path.ends_with("shaders/Common/Compute.hlsl") {
        return None;
    }
    if normalized_path.contains("Vert") {
        Some(ShaderStage::Vertex)
    } else if normalized_path.contains("Frag") {
        Some(ShaderStage::Fragment)
    } else if normalized_path.contains("Compute") {
        Some(ShaderStage::Compute)
    } else {
        None
    }
}

pub struct ShaderCache {
    cache_dir: PathBuf,
}

impl ShaderCache {
    pub fn new(cache_root: impl Into<PathBuf>) -> CacheResult<Self> {
        let cache_dir = cache_root.into().join("shaders");
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

    pub fn read_header(&self, source_path: &str) -> CacheResult<ShaderCacheHeader> {
        let path = self.cached_path(source_path);
        let bytes = fs::read(&path).map_err(|e| CacheError::FileIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        ShaderCacheHeader::from_bytes(&bytes)
    }

    /// `true` when the cached header's stored timestamp differs from the
    /// source file's current one -- the shader cache is the timestamp-
    /// invalidated half of the two caches (contrast `TextureCache`, which is
    /// never invalidated this way).
    pub fn should_recache(&self, source_path: &str, current: FileTime) -> bool {
        match self.read_header(source_path) {
            Ok(header) => header.low_file_time != current.low || header.high_file_time != current.high,
            Err(_) => true,
        }
    }

    /// Write bytecode to the cache, skipping the write (and logging) on I/O
    /// failure rather than propagating -- a failed cache write should not
    /// abort loading, since the bytecode the caller already has is still
    /// usable this run.
    pub fn write_cache(&self, source_path: &str, stage: ShaderStage, file_time: FileTime, bytecode: &ShaderBytecode) {
        let header = ShaderCacheHeader {
            stage: stage as u32,
            low_file_time: file_time.low,
            high_file_time: file_time.high,
            bytecode_u32_count: bytecode.words.len() as u32,
        };
        let path = self.cached_path(source_path);
        let mut out = Vec::with_capacity(HEADER_SIZE + bytecode.byte_len());
        out.extend_from_slice(&header.to_bytes());
        for word in &bytecode.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        if let Err(e) = fs::write(&path, &out) {
            warn!("failed to write shader cache file {}: {e}", path.display());
        } else {
            info!("cached shader {source_path} in {}", path.display());
        }
    }

    /// Read bytecode back out of the cache; demands recompilation on any
    /// failure (missing file, truncated header, short payload) rather than
    /// returning a partial result.
    pub fn get_from_cache(&self, source_path: &str) -> CacheResult<ShaderBytecode> {
        let path = self.cached_path(source_path);
        let bytes = fs::read(&path).map_err(|e| CacheError::FileIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let header = ShaderCacheHeader::from_bytes(&bytes)?;
        let stage = ShaderStage::from_u32(header.stage).ok_or_else(|| CacheError::CorruptCache {
            path: path.display().to_string(),
            reason: format!("unknown shader stage {}", header.stage),
        })?;
        let expected_len = HEADER_SIZE + header.bytecode_u32_count as usize * 4;
        if bytes.len() < expected_len {
            return Err(CacheError::CorruptCache {
                path: path.display().to_string(),
                reason: format!("expected {expected_len} bytes, found {}", bytes.len()),
            });
        }
        let words = bytes[HEADER_SIZE..expected_len]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(ShaderBytecode { stage, words })
    }

    /// Recursively walk `shaders_root`, inferring each candidate's stage from
    /// its path, and cache-compile anything missing or stale. Already-cached,
    /// unchanged shaders are skipped with an "already cached" log line
    /// (covers the "rebuild after a single shader edit" end-to-end case).
    pub fn traverse_directory(
        &self,
        shaders_root: &Path,
        compiler: &dyn ShaderCompilerBackend,
        file_time_of: impl Fn(&Path) -> CacheResult<FileTime>,
    ) -> CacheResult<()> {
        for entry in walk_files(shaders_root)? {
            let normalized = normalize_path(&entry.to_string_lossy());
            let Some(stage) = stage_from_path(&normalized) else {
                continue;
            };
            let file_time = file_time_of(&entry)?;
            if self.exists_in_cache(&normalized) && !self.should_recache(&normalized, file_time) {
                info!("{normalized} already cached — skipping");
                continue;
            }
            match compiler.compile(&entry, stage) {
                Ok(bytecode) => self.write_cache(&normalized, stage, file_time, &bytecode),
                Err(reason) => warn!("shader compilation failed for {normalized}: {reason}"),
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
    fn header_round_trips_through_bytes() {
        let header = ShaderCacheHeader {
            stage: 3,
            low_file_time: 0x1A2B3C4D,
            high_file_time: 0x01D7_A000,
            bytecode_u32_count: 12,
        };
        let bytes = header.to_bytes();
        assert_eq!(ShaderCacheHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn excluded_compute_header_yields_no_stage() {
        assert_eq!(stage_from_path("shaders/Common/Compute.hlsl"), None);
    }

    #[test]
    fn stage_inferred_from_substring() {
        assert_eq!(stage_from_path("shaders/Foo/FooVert.hlsl"), Some(ShaderStage::Vertex));
        assert_eq!(stage_from_path("shaders/Foo/FooFrag.hlsl"), Some(ShaderStage::Fragment));
        assert_eq!(stage_from_path("shaders/Foo/FooCompute.hlsl"), Some(ShaderStage::Compute));
        assert_eq!(stage_from_path("shaders/Foo/FooUtil.hlsl"), None);
    }

    #[test]
    fn write_then_get_from_cache_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ShaderCache::new(dir.path()).unwrap();
        let bytecode = ShaderBytecode {
            stage: ShaderStage::Compute,
            words: vec![1, 2, 3, 4],
        };
        let ft = FileTime { low: 0x1A2B3C4D, high: 0x01D7_A000 };
        cache.write_cache("shaders/Foo/FooCompute.hlsl", ShaderStage::Compute, ft, &bytecode);
        let read_back = cache.get_from_cache("shaders/Foo/FooCompute.hlsl").unwrap();
        assert_eq!(read_back.words, bytecode.words);
        assert!(!cache.should_recache("shaders/Foo/FooCompute.hlsl", ft));
        let changed = FileTime { low: 0, high: 0 };
        assert!(cache.should_recache("shaders/Foo/FooCompute.hlsl", changed));
    }
}
