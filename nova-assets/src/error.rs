use thiserror::Error;

/// The non-fatal error kinds this crate can surface (`ShaderCompilation`,
/// `AssetLoad`, `FileIo` from the RHI's error taxonomy). None of these are
/// treated as fatal here: callers log and degrade per the policy table
/// rather than unwind.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("shader compilation failed for {path}: {reason}")]
    ShaderCompilation { path: String, reason: String },

    #[error("failed to load asset {path}: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("cache I/O failure for {path}: {reason}")]
    FileIo { path: String, reason: String },

    #[error("corrupt cache file {path}: {reason}")]
    CorruptCache { path: String, reason: String },
}

pub type CacheResult<T> = Result<T, CacheError>;
