//! Renderer-wide tunables: one plain struct per concern, all
//! `Default`-constructible, no config-file crate involved.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToneMappingMode {
    #[default]
    Aces,
    Reinhard,
}

/// Short-circuits the deferred lighting pass's output to one G-buffer channel
/// for inspection, per the pass's mode selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeferredDebugMode {
    #[default]
    Default,
    Albedo,
    Normal,
    MetallicRoughness,
    AmbientOcclusion,
    Emissive,
    Specular,
    Ambient,
    Position,
    Velocity,
}

#[derive(Clone, Copy, Debug)]
pub struct AutoExposureConfig {
    pub min_log_luminance: f32,
    pub luminance_range: f32,
    pub tau: f32,
}

impl Default for AutoExposureConfig {
    fn default() -> Self {
        Self {
            min_log_luminance: -10.0,
            luminance_range: 12.0,
            tau: 1.1,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct OrthoBounds {
    pub x: (f32, f32),
    pub y: (f32, f32),
    pub z: (f32, f32),
}

impl Default for OrthoBounds {
    fn default() -> Self {
        Self {
            x: (-25.0, 25.0),
            y: (-25.0, 25.0),
            z: (0.05, 50.0),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ShadowConfig {
    pub resolution: u32,
    pub ortho_bounds: OrthoBounds,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 4096,
            ortho_bounds: OrthoBounds::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ColorCorrectionConfig {
    pub exposure: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for ColorCorrectionConfig {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub shadow: ShadowConfig,
    pub auto_exposure: AutoExposureConfig,
    pub color_correction: ColorCorrectionConfig,
    pub tone_mapping: ToneMappingMode,
    pub deferred_debug_mode: DeferredDebugMode,
    pub ibl_enabled: bool,
    pub taa_enabled: bool,
    /// Matches `nova_assets::file_watch::CHECK_INTERVAL`; kept here too since
    /// passes construct their own `HotReloadablePipeline` watches directly.
    pub hot_reload_debounce_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadow: ShadowConfig::default(),
            auto_exposure: AutoExposureConfig::default(),
            color_correction: ColorCorrectionConfig::default(),
            tone_mapping: ToneMappingMode::default(),
            deferred_debug_mode: DeferredDebugMode::default(),
            ibl_enabled: true,
            taa_enabled: true,
            hot_reload_debounce_ms: 500,
        }
    }
}
