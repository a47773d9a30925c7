/// Mirrors the original's `ShaderType` enum values exactly (0 = none through
/// 6 = raytracing) since the shader-cache header on disk stores this as a
/// raw `u32` and the values must round-trip unchanged across a rebuild of
/// this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ShaderStage {
    None = 0,
    Vertex = 1,
    Fragment = 2,
    Compute = 3,
    Mesh = 4,
    Amplification = 5,
    Raytracing = 6,
}

impl ShaderStage {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => ShaderStage::None,
            1 => ShaderStage::Vertex,
            2 => ShaderStage::Fragment,
            3 => ShaderStage::Compute,
            4 => ShaderStage::Mesh,
            5 => ShaderStage::Amplification,
            6 => ShaderStage::Raytracing,
            _ => return None,
        })
    }

    /// DXC target profile string for this stage, fixed at shader model 6.6.
    pub fn target_profile(self) -> &'static str {
        match self {
            ShaderStage::None => "",
            ShaderStage::Vertex => "vs_6_6",
            ShaderStage::Fragment => "ps_6_6",
            ShaderStage::Compute => "cs_6_6",
            ShaderStage::Mesh => "ms_6_6",
            ShaderStage::Amplification => "as_6_6",
            ShaderStage::Raytracing => "lib_6_6",
        }
    }
}

pub const SHADER_ENTRY_POINT: &str = "Main";

/// Compiled shader bytecode (DXIL/SPIR-V words) plus the stage it was
/// compiled for. What a `ShaderCompilerBackend` produces and what gets
/// persisted to the shader cache's `.oni` files.
#[derive(Debug, Clone)]
pub struct ShaderBytecode {
    pub stage: ShaderStage,
    pub words: Vec<u32>,
}

impl ShaderBytecode {
    pub fn byte_len(&self) -> usize {
        self.words.len() * 4
    }
}
