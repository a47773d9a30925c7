use thiserror::Error;

/// Errors a pass can raise while rendering, resizing, or rebuilding its
/// pipeline. Mirrors `nova_rhi::RhiError` / `nova_assets::CacheError`'s shape
/// at this crate's own boundary.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("pass '{pass}' failed to rebuild its pipeline: {reason}")]
    PipelineRebuild { pass: String, reason: String },

    #[error(transparent)]
    Rhi(#[from] nova_rhi::RhiError),

    #[error(transparent)]
    Assets(#[from] nova_assets::CacheError),
}

pub type PassResult<T> = Result<T, PassError>;
