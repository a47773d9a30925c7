pub mod error;
pub mod file_watch;
pub mod hash;
pub mod shader_cache;
pub mod texture;
pub mod texture_cache;

pub use error::{CacheError, CacheResult};
pub use file_watch::FileWatch;
pub use hash::{cache_filename, normalize_path, CACHE_SEED};
pub use shader_cache::{stage_from_path, FileTime, NullCompiler, ShaderCache, ShaderCacheHeader, ShaderCompilerBackend};
pub use texture_cache::{mip_byte_size, CpuBc1Bc7Compressor, TextureCache, TextureCacheMode, TextureCompressorBackend, TextureFileHeader};
