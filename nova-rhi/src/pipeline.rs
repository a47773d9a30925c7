use std::path::PathBuf;

use log::{info, warn};

use crate::shader::{ShaderBytecode, ShaderStage};

/// Opaque handle to a built pipeline, returned by `Device::create_graphics_pipeline`
/// / `create_compute_pipeline`. Cheap to copy; the device owns the backing
/// `vk::Pipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub(crate) u64);

/// The root signature every pipeline in this RHI shares: a single block of
/// inline push constants carrying bindless `DescriptorIndex` values, plus
/// (optionally) one dedicated SRV slot for a raytracing top-level acceleration
/// structure. There is no per-draw descriptor-set binding — see spec § 4.2.
#[derive(Debug, Clone)]
pub struct RootSignature {
    pub push_constant_bytes: u32,
    pub uses_tlas_srv: bool,
}

impl Default for RootSignature {
    fn default() -> Self {
        Self {
            push_constant_bytes: 128,
            uses_tlas_srv: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    LineList,
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    pub root_signature: RootSignature,
    pub color_formats: Vec<crate::resource::Format>,
    pub depth_format: Option<crate::resource::Format>,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub cull_mode: CullMode,
    pub topology: PrimitiveTopology,
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDesc {
    pub root_signature: RootSignature,
}

/// One watched shader source the pipeline recompiles from, mirroring the
/// original's `ShaderWatch` (path + entry point + stage + a 500ms-debounced
/// `FileWatch`). Kept in `nova-rhi` rather than `nova-assets` since rebuilding
/// the owning pipeline is the RHI's job; `nova_assets::FileWatch` does the
/// actual polling.
pub struct ShaderWatch {
    pub path: PathBuf,
    pub entry_point: String,
    pub stage: ShaderStage,
    pub(crate) watch: nova_assets_watch::FileWatch,
    pub(crate) bytecode: Option<ShaderBytecode>,
}

// `nova-rhi` doesn't depend on `nova-assets` (that would invert the crate
// graph — assets loads compiled shaders for the RHI to consume, not the other
// way around), so the file-watch primitive is re-declared locally at the size
// the RHI actually needs: path + last-seen timestamp, 500ms debounced.
pub mod nova_assets_watch {
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    pub const CHECK_INTERVAL: Duration = Duration::from_millis(500);

    pub struct FileWatch {
        path: PathBuf,
        last_checked: Instant,
        last_modified: Option<std::time::SystemTime>,
    }

    impl FileWatch {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            let path = path.into();
            let last_modified = std::fs::metadata(&path).ok().and_then(|m| m.modified().ok());
            Self {
                path,
                last_checked: Instant::now(),
                last_modified,
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Returns `true` if the file changed since the last check, but only
        /// actually stats the filesystem once per `CHECK_INTERVAL` -- calling
        /// this every frame costs nothing between polls.
        pub fn check(&mut self) -> bool {
            if self.last_checked.elapsed() < CHECK_INTERVAL {
                return false;
            }
            self.last_checked = Instant::now();
            let modified = std::fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
            if modified != self.last_modified {
                self.last_modified = modified;
                true
            } else {
                false
            }
        }
    }
}

/// A pipeline that rebuilds itself from its `ShaderWatch`es when their
/// backing source changes on disk. On a failed recompile it logs and keeps
/// serving the last-good `PipelineHandle` rather than leaving the caller
/// without a pipeline to bind -- ported from
/// `HotReloadablePipeline::CheckForRebuild`.
pub struct HotReloadablePipeline {
    pub name: String,
    shaders: Vec<ShaderWatch>,
    current: Option<PipelineHandle>,
}

impl HotReloadablePipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shaders: Vec::new(),
            current: None,
        }
    }

    pub fn add_shader_watch(&mut self, path: impl Into<PathBuf>, entry_point: impl Into<String>, stage: ShaderStage) {
        let path = path.into();
        self.shaders.push(ShaderWatch {
            watch: nova_assets_watch::FileWatch::new(&path),
            path,
            entry_point: entry_point.into(),
            stage,
            bytecode: None,
        });
    }

    pub fn current(&self) -> Option<PipelineHandle> {
        self.current
    }

    pub fn set_current(&mut self, handle: PipelineHandle) {
        self.current = Some(handle);
    }

    /// Poll every watched shader; if any changed, attempt to rebuild the
    /// pipeline via `rebuild`. `rebuild` is a closure over the concrete
    /// device/pipeline-desc since `nova-rhi`'s pipeline module has no device
    /// handle of its own.
    pub fn check_for_rebuild<F>(&mut self, mut rebuild: F)
    where
        F: FnMut(&[ShaderWatch]) -> Result<PipelineHandle, String>,
    {
        let mut any_changed = false;
        for shader in &mut self.shaders {
            if shader.watch.check() {
                any_changed = true;
            }
        }
        if !any_changed {
            return;
        }
        match rebuild(&self.shaders) {
            Ok(handle) => {
                info!("rebuilt pipeline '{}' after shader change", self.name);
                self.current = Some(handle);
            }
            Err(err) => {
                warn!(
                    "failed to rebuild pipeline '{}', keeping previous build: {err}",
                    self.name
                );
            }
        }
    }

    /// Build unconditionally, ignoring the file-change gate `check_for_rebuild`
    /// applies. Callers use this once at construction to get a pipeline bound
    /// before the first frame; `check_for_rebuild` takes over afterward.
    pub fn force_rebuild<F>(&mut self, mut rebuild: F) -> Result<(), String>
    where
        F: FnMut(&[ShaderWatch]) -> Result<PipelineHandle, String>,
    {
        let handle = rebuild(&self.shaders)?;
        info!("built pipeline '{}'", self.name);
        self.current = Some(handle);
        Ok(())
    }
}
