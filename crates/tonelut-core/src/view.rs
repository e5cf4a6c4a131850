//! Per-view render state supplied by the host each frame.

use glam::{Vec3, Vec4};

use crate::aces::AcesTonemapParams;

/// How white balance temperature is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemperatureMethod {
    /// Adapt the scene white toward the chosen temperature.
    #[default]
    WhiteBalance,
    /// Tint the scene as if lit by the chosen temperature.
    ColorTemperature,
}

/// Saturation/contrast/gamma/gain/offset for one tone range. `w` is the master.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorGradeRange {
    pub saturation: Vec4,
    pub contrast: Vec4,
    pub gamma: Vec4,
    pub gain: Vec4,
    pub offset: Vec4,
}

impl Default for ColorGradeRange {
    fn default() -> Self {
        Self {
            saturation: Vec4::ONE,
            contrast: Vec4::ONE,
            gamma: Vec4::ONE,
            gain: Vec4::ONE,
            offset: Vec4::ZERO,
        }
    }
}

/// Resolved post-process settings of a view.
///
/// `Default` is the neutral set used when color grading is disabled.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessSettings {
    pub temperature_type: TemperatureMethod,
    /// Kelvin. 6500 is neutral.
    pub white_temp: f32,
    pub white_tint: f32,
    pub global: ColorGradeRange,
    pub shadows: ColorGradeRange,
    pub midtones: ColorGradeRange,
    pub highlights: ColorGradeRange,
    pub shadows_max: f32,
    pub highlights_min: f32,
    pub highlights_max: f32,
    pub blue_correction: f32,
    pub expand_gamut: f32,
    pub tone_curve_amount: f32,
    pub film_slope: f32,
    pub film_toe: f32,
    pub film_shoulder: f32,
    pub film_black_clip: f32,
    pub film_white_clip: f32,
}

pub const DEFAULT_WHITE_TEMP: f32 = 6500.0;
pub const DEFAULT_WHITE_TINT: f32 = 0.0;

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            temperature_type: TemperatureMethod::WhiteBalance,
            white_temp: DEFAULT_WHITE_TEMP,
            white_tint: DEFAULT_WHITE_TINT,
            global: ColorGradeRange::default(),
            shadows: ColorGradeRange::default(),
            midtones: ColorGradeRange::default(),
            highlights: ColorGradeRange::default(),
            shadows_max: 0.09,
            highlights_min: 0.5,
            highlights_max: 1.0,
            blue_correction: 0.6,
            expand_gamut: 1.0,
            tone_curve_amount: 1.0,
            film_slope: 0.88,
            film_toe: 0.55,
            film_shoulder: 0.26,
            film_black_clip: 0.0,
            film_white_clip: 0.04,
        }
    }
}

/// Display output encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputDevice {
    #[default]
    SdrSrgb,
    SdrRec709,
    SdrExplicitGamma,
    HdrAces1000NitSt2084,
    HdrAces2000NitSt2084,
    HdrAces1000NitScRgb,
    HdrAces2000NitScRgb,
    HdrLinearExr,
    HdrLinearNoToneCurve,
    HdrLinearWithToneCurve,
}

impl OutputDevice {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn is_hdr(self) -> bool {
        !matches!(self, Self::SdrSrgb | Self::SdrRec709 | Self::SdrExplicitGamma)
    }
}

/// Display output gamut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputGamut {
    #[default]
    Rec709,
    DciP3,
    Rec2020,
    Aces,
    AcesCg,
}

impl OutputGamut {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputDeviceParameters {
    pub inverse_gamma: Vec3,
    pub output_device: OutputDevice,
    pub output_gamut: OutputGamut,
    /// Peak luminance in nits.
    pub output_max_luminance: f32,
}

impl Default for OutputDeviceParameters {
    fn default() -> Self {
        let gamma = 2.2_f32;
        Self {
            inverse_gamma: Vec3::new(1.0 / gamma, 2.2 / gamma, 1.0 / gamma.max(1.0)),
            output_device: OutputDevice::SdrSrgb,
            output_gamut: OutputGamut::Rec709,
            output_max_luminance: 100.0,
        }
    }
}

impl OutputDeviceParameters {
    /// ACES spline matching this device's luminance range.
    pub fn aces_params(&self, scene_color_multiplier: f32, gamut_compression: f32) -> AcesTonemapParams {
        let (min_lum, max_lum) = match self.output_device {
            OutputDevice::HdrAces1000NitSt2084 | OutputDevice::HdrAces1000NitScRgb => (0.0001, 1000.0),
            OutputDevice::HdrAces2000NitSt2084 | OutputDevice::HdrAces2000NitScRgb => (0.0001, 2000.0),
            device if device.is_hdr() => (0.0001, self.output_max_luminance.max(48.0)),
            _ => (0.02, 48.0),
        };
        AcesTonemapParams::from_display(min_lum, max_lum, scene_color_multiplier, gamut_compression)
    }
}

/// What the view is being captured as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SceneCaptureSource {
    #[default]
    FinalColorLdr,
    /// Float output, bypasses display encoding.
    FinalColorHdr,
    /// Float output, tone curve only.
    FinalToneCurveHdr,
    SceneColorHdr,
}

impl SceneCaptureSource {
    /// Whether the host expects a float LUT for this capture.
    pub const fn requires_float_output(self) -> bool {
        matches!(self, Self::FinalColorHdr | Self::FinalToneCurveHdr)
    }
}

/// Graphics API family of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsBackend {
    Vulkan,
    Metal,
    Dx12,
    Gl,
    BrowserWebGpu,
    Other,
}

/// Coarse shader model tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureLevel {
    /// Mobile / GLES class, no compute guarantee.
    Es31,
    /// Desktop class with compute shaders.
    Sm5,
    Sm6,
}

/// Hardware identity plus the capabilities the LUT pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderPlatform {
    pub backend: GraphicsBackend,
    pub feature_level: FeatureLevel,
    /// Rendering into individual slices of a 3D texture is guaranteed.
    pub volume_texture_rendering: bool,
    pub geometry_shaders: bool,
    /// Vertex shaders can select the output layer/slice.
    pub vertex_shader_layer: bool,
}

impl ShaderPlatform {
    /// Volume LUTs need slice rendering plus a way to route primitives to a slice.
    pub const fn supports_volume_lut(&self) -> bool {
        self.volume_texture_rendering && (self.geometry_shaders || self.vertex_shader_layer)
    }

    pub fn supports_compute(&self) -> bool {
        self.feature_level >= FeatureLevel::Sm5
    }
}

impl Default for ShaderPlatform {
    fn default() -> Self {
        Self {
            backend: GraphicsBackend::Vulkan,
            feature_level: FeatureLevel::Sm5,
            volume_texture_rendering: true,
            geometry_shaders: false,
            vertex_shader_layer: true,
        }
    }
}

/// Everything the LUT pipeline reads from a view for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Persistent view-state key, `None` for transient views (e.g. thumbnails).
    pub view_key: Option<u32>,
    pub shader_platform: ShaderPlatform,
    pub use_compute_passes: bool,
    pub color_scale: Vec3,
    pub overlay_color: Vec4,
    /// Color-grading show flag. When off, neutral post-process defaults are used.
    pub color_grading: bool,
    pub post_process: PostProcessSettings,
    pub output: OutputDeviceParameters,
    pub scene_capture_source: SceneCaptureSource,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            view_key: Some(1),
            shader_platform: ShaderPlatform::default(),
            use_compute_passes: true,
            color_scale: Vec3::ONE,
            overlay_color: Vec4::ZERO,
            color_grading: true,
            post_process: PostProcessSettings::default(),
            output: OutputDeviceParameters::default(),
            scene_capture_source: SceneCaptureSource::FinalColorLdr,
        }
    }
}

impl ViewState {
    /// Post-process settings feeding the LUT, honoring the color-grading flag.
    pub fn effective_post_process(&self) -> PostProcessSettings {
        if self.color_grading {
            self.post_process.clone()
        } else {
            PostProcessSettings::default()
        }
    }

    /// Replace grading inputs with neutral values so a host LUT pass that runs
    /// afterwards has nothing to regenerate.
    pub fn neutralize_color_grading(&mut self) {
        self.post_process = PostProcessSettings::default();
        self.color_grading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_lut_requires_slice_routing() {
        let mut platform = ShaderPlatform {
            geometry_shaders: false,
            vertex_shader_layer: false,
            ..ShaderPlatform::default()
        };
        assert!(!platform.supports_volume_lut());
        platform.geometry_shaders = true;
        assert!(platform.supports_volume_lut());
        platform.volume_texture_rendering = false;
        assert!(!platform.supports_volume_lut());
    }

    #[test]
    fn test_disabled_grading_uses_defaults() {
        let mut view = ViewState::default();
        view.post_process.white_temp = 4000.0;
        view.color_grading = false;
        assert_eq!(view.effective_post_process(), PostProcessSettings::default());
    }

    #[test]
    fn test_hdr_device_selects_wider_aces_range() {
        let sdr = OutputDeviceParameters::default();
        let hdr = OutputDeviceParameters {
            output_device: OutputDevice::HdrAces1000NitSt2084,
            ..sdr
        };
        assert!(hdr.aces_params(1.5, 0.0).min_max_data.w > sdr.aces_params(1.5, 0.0).min_max_data.w);
    }
}
