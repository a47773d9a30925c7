use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Rhi(#[from] nova_rhi::RhiError),

    #[error(transparent)]
    Pass(#[from] nova_renderer::PassError),

    #[error("failed to write screenshot to {path}: {reason}")]
    Screenshot { path: String, reason: String },
}

pub type AppResult<T> = Result<T, AppError>;
