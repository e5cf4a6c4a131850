//! Parameter cache and change detection for LUT regeneration.
//!
//! [`CachedLutSettings`] holds a snapshot of every value that can influence
//! the LUT contents. Each frame [`CachedLutSettings::update_cached_values`]
//! compares a freshly gathered snapshot field-by-field, overwrites what
//! differs and reports whether anything changed. Every field is visited on
//! every call so the result is the union of all deltas.

use glam::{Vec3, Vec4};

use crate::aces::AcesTonemapParams;
use crate::color_space::WorkingColorSpace;
use crate::cvars::ConsoleVariables;
use crate::settings::{Gt7UcsType, TonemapOperator, TonemapSettings};
use crate::texture::{LutTextureBinding, SamplerHandle, TextureAssets, TextureHandle};
use crate::view::{
    ColorGradeRange, OutputDeviceParameters, ShaderPlatform, TemperatureMethod, ViewState,
};

/// Operator parameters that live outside the host's own grading settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CustomTonemapParameters {
    pub reinhard_white_point: f32,
    pub hejl_white_point: f32,
    pub gt7_blend_ratio: f32,
    pub gt7_fade_start: f32,
    pub gt7_fade_end: f32,
    pub lut_texture: LutTextureBinding,
}

/// Every numeric and texture value fed to the LUT program.
#[derive(Debug, Clone, PartialEq)]
pub struct LutParameterBlock {
    pub aces: AcesTonemapParams,
    pub lut_size: u32,
    pub overlay_color: Vec4,
    pub color_scale: Vec3,
    pub global: ColorGradeRange,
    pub shadows: ColorGradeRange,
    pub midtones: ColorGradeRange,
    pub highlights: ColorGradeRange,
    pub shadows_max: f32,
    pub highlights_min: f32,
    pub highlights_max: f32,
    pub white_temp: f32,
    pub white_tint: f32,
    pub is_temperature_white_balance: bool,
    pub blue_correction: f32,
    pub expand_gamut: f32,
    pub tone_curve_amount: f32,
    pub film_slope: f32,
    pub film_toe: f32,
    pub film_shoulder: f32,
    pub film_black_clip: f32,
    pub film_white_clip: f32,
    /// `(a, b, c)` of `a·x² + b·x + c`.
    pub mapping_polynomial: Vec3,
    pub output: OutputDeviceParameters,
    pub custom: CustomTonemapParameters,
}

impl Default for LutParameterBlock {
    fn default() -> Self {
        Self {
            aces: AcesTonemapParams::default(),
            lut_size: 0,
            overlay_color: Vec4::ZERO,
            color_scale: Vec3::ZERO,
            global: ColorGradeRange::default(),
            shadows: ColorGradeRange::default(),
            midtones: ColorGradeRange::default(),
            highlights: ColorGradeRange::default(),
            shadows_max: 0.0,
            highlights_min: 0.0,
            highlights_max: 0.0,
            white_temp: 0.0,
            white_tint: 0.0,
            is_temperature_white_balance: false,
            blue_correction: 0.0,
            expand_gamut: 0.0,
            tone_curve_amount: 0.0,
            film_slope: 0.0,
            film_toe: 0.0,
            film_shoulder: 0.0,
            film_black_clip: 0.0,
            film_white_clip: 0.0,
            mapping_polynomial: Vec3::ZERO,
            output: OutputDeviceParameters::default(),
            custom: CustomTonemapParameters::default(),
        }
    }
}

/// Inputs polled from outside the view once per frame.
#[derive(Clone, Copy)]
pub struct FrameInputs<'a> {
    pub settings: &'a TonemapSettings,
    pub cvars: &'a ConsoleVariables,
    /// Global working color space; `None` when the source is not available yet.
    pub working_color_space: Option<&'a WorkingColorSpace>,
    pub assets: &'a dyn TextureAssets,
}

/// Snapshot of everything the last generated LUT was built from.
///
/// One instance per render context. It remembers a single view, so
/// alternating views always miss.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedLutSettings {
    pub view_key: u32,
    pub shader_platform: ShaderPlatform,
    pub use_compute: bool,
    pub operator: TonemapOperator,
    pub gt7_ucs_type: Gt7UcsType,
    pub parameters: LutParameterBlock,
    pub working_color_space: WorkingColorSpace,
    primed: bool,
}

impl Default for CachedLutSettings {
    fn default() -> Self {
        Self {
            view_key: 0,
            shader_platform: ShaderPlatform::default(),
            use_compute: false,
            operator: TonemapOperator::default(),
            gt7_ucs_type: Gt7UcsType::default(),
            parameters: LutParameterBlock::default(),
            working_color_space: WorkingColorSpace::default(),
            primed: false,
        }
    }
}

/// Overwrite `dst` when it differs from `value`, flagging the change.
fn update<T: PartialEq>(dst: &mut T, value: T, changed: &mut bool) {
    if *dst != value {
        *dst = value;
        *changed = true;
    }
}

fn update_range(dst: &mut ColorGradeRange, src: &ColorGradeRange, changed: &mut bool) {
    update(&mut dst.saturation, src.saturation, changed);
    update(&mut dst.contrast, src.contrast, changed);
    update(&mut dst.gamma, src.gamma, changed);
    update(&mut dst.gain, src.gain, changed);
    update(&mut dst.offset, src.offset, changed);
}

/// Quadratic through `(0, min)`, `(0.5, mid)` and `(1, max)`, returned as `(a, b, c)`.
///
/// Inputs are clamped to `[-10, 10]`.
pub fn mapping_polynomial(min: f32, mid: f32, max: f32) -> Vec3 {
    let min = min.clamp(-10.0, 10.0);
    let mid = mid.clamp(-10.0, 10.0);
    let max = max.clamp(-10.0, 10.0);
    let c = min;
    let b = 4.0 * mid - 3.0 * min - max;
    let a = max - min - b;
    Vec3::new(a, b, c)
}

impl CachedLutSettings {
    /// Refresh the snapshot from the current frame. Returns `true` if any field
    /// changed, and always on the first call.
    pub fn update_cached_values(
        &mut self,
        view: &ViewState,
        lut_size: u32,
        inputs: &FrameInputs<'_>,
    ) -> bool {
        let mut changed = !self.primed;
        self.primed = true;

        self.update_combine_parameters(view, lut_size, inputs.cvars, &mut changed);
        self.update_custom_parameters(inputs.settings, inputs.assets, &mut changed);

        update(&mut self.view_key, view.view_key.unwrap_or(0), &mut changed);
        update(&mut self.shader_platform, view.shader_platform, &mut changed);
        update(&mut self.use_compute, view.use_compute_passes, &mut changed);
        update(&mut self.operator, inputs.settings.operator, &mut changed);
        update(&mut self.gt7_ucs_type, inputs.settings.gt7_ucs_type, &mut changed);

        if let Some(source) = inputs.working_color_space {
            let cached = &mut self.working_color_space;
            update(&mut cached.to_xyz, source.to_xyz, &mut changed);
            update(&mut cached.from_xyz, source.from_xyz, &mut changed);
            update(&mut cached.to_ap1, source.to_ap1, &mut changed);
            update(&mut cached.from_ap1, source.from_ap1, &mut changed);
            update(&mut cached.to_ap0, source.to_ap0, &mut changed);
            update(&mut cached.is_srgb, source.is_srgb, &mut changed);
        }

        changed
    }

    /// Drop the snapshot so the next update reports a change.
    pub fn invalidate(&mut self) {
        self.primed = false;
    }

    fn update_combine_parameters(
        &mut self,
        view: &ViewState,
        lut_size: u32,
        cvars: &ConsoleVariables,
        changed: &mut bool,
    ) {
        let settings = view.effective_post_process();
        let p = &mut self.parameters;

        let aces = view
            .output
            .aces_params(cvars.aces_scene_color_multiplier, cvars.aces_gamut_compression);
        update(&mut p.aces.min_max_data, aces.min_max_data, changed);
        update(&mut p.aces.mid_data, aces.mid_data, changed);
        update(&mut p.aces.coefs_low_0, aces.coefs_low_0, changed);
        update(&mut p.aces.coefs_high_0, aces.coefs_high_0, changed);
        update(&mut p.aces.coefs_low_4, aces.coefs_low_4, changed);
        update(&mut p.aces.coefs_high_4, aces.coefs_high_4, changed);
        update(&mut p.aces.scene_color_multiplier, aces.scene_color_multiplier, changed);
        update(&mut p.aces.gamut_compression, aces.gamut_compression, changed);

        update(&mut p.color_scale, view.color_scale, changed);
        update(&mut p.overlay_color, view.overlay_color, changed);
        update(
            &mut p.mapping_polynomial,
            mapping_polynomial(cvars.color_min, cvars.color_mid, cvars.color_max),
            changed,
        );

        update(
            &mut p.is_temperature_white_balance,
            settings.temperature_type == TemperatureMethod::WhiteBalance,
            changed,
        );
        update(&mut p.lut_size, lut_size, changed);
        update(&mut p.white_temp, settings.white_temp, changed);
        update(&mut p.white_tint, settings.white_tint, changed);

        update_range(&mut p.global, &settings.global, changed);
        update_range(&mut p.shadows, &settings.shadows, changed);
        update_range(&mut p.midtones, &settings.midtones, changed);
        update_range(&mut p.highlights, &settings.highlights, changed);

        update(&mut p.shadows_max, settings.shadows_max, changed);
        update(&mut p.highlights_min, settings.highlights_min, changed);
        update(&mut p.highlights_max, settings.highlights_max, changed);

        update(&mut p.blue_correction, settings.blue_correction, changed);
        update(&mut p.expand_gamut, settings.expand_gamut, changed);
        update(&mut p.tone_curve_amount, settings.tone_curve_amount, changed);

        update(&mut p.film_slope, settings.film_slope, changed);
        update(&mut p.film_toe, settings.film_toe, changed);
        update(&mut p.film_shoulder, settings.film_shoulder, changed);
        update(&mut p.film_black_clip, settings.film_black_clip, changed);
        update(&mut p.film_white_clip, settings.film_white_clip, changed);

        let output = &view.output;
        update(&mut p.output.inverse_gamma, output.inverse_gamma, changed);
        update(&mut p.output.output_device, output.output_device, changed);
        update(&mut p.output.output_gamut, output.output_gamut, changed);
        update(&mut p.output.output_max_luminance, output.output_max_luminance, changed);
    }

    fn update_custom_parameters(
        &mut self,
        settings: &TonemapSettings,
        assets: &dyn TextureAssets,
        changed: &mut bool,
    ) {
        let custom = &mut self.parameters.custom;
        update(&mut custom.reinhard_white_point, settings.reinhard_white_point, changed);
        update(&mut custom.hejl_white_point, settings.hejl_white_point, changed);
        update(&mut custom.gt7_blend_ratio, settings.gt7_blend_ratio, changed);
        update(&mut custom.gt7_fade_start, settings.gt7_fade_start, changed);
        update(&mut custom.gt7_fade_end, settings.gt7_fade_end, changed);

        let mut texture = TextureHandle::BLACK;
        if settings.operator.uses_lut_texture()
            && let Some(resolved) = settings.lut_texture.as_deref().and_then(|p| assets.resolve(p))
        {
            texture = resolved;
        }
        update(&mut custom.lut_texture.texture, texture, changed);
        update(&mut custom.lut_texture.sampler, SamplerHandle::BilinearClamp, changed);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::color_space::ColorPrimaries;
    use crate::view::{OutputDevice, OutputGamut};

    const EPSILON: f32 = 1e-5;

    struct Scenario {
        view: ViewState,
        settings: TonemapSettings,
        cvars: ConsoleVariables,
        working: WorkingColorSpace,
        assets: HashMap<String, TextureHandle>,
        lut_size: u32,
    }

    impl Scenario {
        fn new() -> Self {
            let mut assets = HashMap::new();
            assets.insert("luts/tony.cube".to_string(), TextureHandle(7));
            assets.insert("luts/other.cube".to_string(), TextureHandle(8));
            Self {
                view: ViewState::default(),
                settings: TonemapSettings {
                    operator: TonemapOperator::TonyMcMapface,
                    lut_texture: Some("luts/tony.cube".to_string()),
                    ..TonemapSettings::default()
                },
                cvars: ConsoleVariables::default(),
                working: WorkingColorSpace::srgb(),
                assets,
                lut_size: 32,
            }
        }

        fn update(&self, cache: &mut CachedLutSettings) -> bool {
            let inputs = FrameInputs {
                settings: &self.settings,
                cvars: &self.cvars,
                working_color_space: Some(&self.working),
                assets: &self.assets,
            };
            cache.update_cached_values(&self.view, self.lut_size, &inputs)
        }
    }

    type Mutation = (&'static str, fn(&mut Scenario));

    fn bump(v: &mut Vec4) {
        v.x += 0.25;
    }

    fn mutations() -> Vec<Mutation> {
        let mut table: Vec<Mutation> = Vec::new();
        table.push(("view_key", |s| s.view.view_key = Some(99)));
        table.push(("shader_platform", |s| s.view.shader_platform.geometry_shaders = true));
        table.push(("use_compute", |s| s.view.use_compute_passes = false));
        table.push(("operator", |s| s.settings.operator = TonemapOperator::Gt7));
        table.push(("gt7_ucs_type", |s| s.settings.gt7_ucs_type = Gt7UcsType::Jzazbz));
        table.push(("lut_size", |s| s.lut_size = 16));
        table.push(("color_scale", |s| s.view.color_scale = Vec3::splat(0.5)));
        table.push(("overlay_color", |s| s.view.overlay_color = Vec4::new(1.0, 0.0, 0.0, 0.5)));
        table.push(("color_min", |s| s.cvars.color_min = 0.1));
        table.push(("color_mid", |s| s.cvars.color_mid = 0.4));
        table.push(("color_max", |s| s.cvars.color_max = 0.9));
        table.push(("aces_scene_color_multiplier", |s| s.cvars.aces_scene_color_multiplier = 1.0));
        table.push(("aces_gamut_compression", |s| s.cvars.aces_gamut_compression = 0.5));
        table.push(("temperature_type", |s| {
            s.view.post_process.temperature_type = TemperatureMethod::ColorTemperature
        }));
        table.push(("white_temp", |s| s.view.post_process.white_temp = 5000.0));
        table.push(("white_tint", |s| s.view.post_process.white_tint = 0.2));
        table.push(("global.saturation", |s| bump(&mut s.view.post_process.global.saturation)));
        table.push(("global.contrast", |s| bump(&mut s.view.post_process.global.contrast)));
        table.push(("global.gamma", |s| bump(&mut s.view.post_process.global.gamma)));
        table.push(("global.gain", |s| bump(&mut s.view.post_process.global.gain)));
        table.push(("global.offset", |s| bump(&mut s.view.post_process.global.offset)));
        table.push(("shadows.saturation", |s| bump(&mut s.view.post_process.shadows.saturation)));
        table.push(("shadows.contrast", |s| bump(&mut s.view.post_process.shadows.contrast)));
        table.push(("shadows.gamma", |s| bump(&mut s.view.post_process.shadows.gamma)));
        table.push(("shadows.gain", |s| bump(&mut s.view.post_process.shadows.gain)));
        table.push(("shadows.offset", |s| bump(&mut s.view.post_process.shadows.offset)));
        table.push(("midtones.saturation", |s| bump(&mut s.view.post_process.midtones.saturation)));
        table.push(("midtones.contrast", |s| bump(&mut s.view.post_process.midtones.contrast)));
        table.push(("midtones.gamma", |s| bump(&mut s.view.post_process.midtones.gamma)));
        table.push(("midtones.gain", |s| bump(&mut s.view.post_process.midtones.gain)));
        table.push(("midtones.offset", |s| bump(&mut s.view.post_process.midtones.offset)));
        table.push(("highlights.saturation", |s| bump(&mut s.view.post_process.highlights.saturation)));
        table.push(("highlights.contrast", |s| bump(&mut s.view.post_process.highlights.contrast)));
        table.push(("highlights.gamma", |s| bump(&mut s.view.post_process.highlights.gamma)));
        table.push(("highlights.gain", |s| bump(&mut s.view.post_process.highlights.gain)));
        table.push(("highlights.offset", |s| bump(&mut s.view.post_process.highlights.offset)));
        table.push(("shadows_max", |s| s.view.post_process.shadows_max = 0.2));
        table.push(("highlights_min", |s| s.view.post_process.highlights_min = 0.6));
        table.push(("highlights_max", |s| s.view.post_process.highlights_max = 2.0));
        table.push(("blue_correction", |s| s.view.post_process.blue_correction = 0.0));
        table.push(("expand_gamut", |s| s.view.post_process.expand_gamut = 0.0));
        table.push(("tone_curve_amount", |s| s.view.post_process.tone_curve_amount = 0.5));
        table.push(("film_slope", |s| s.view.post_process.film_slope = 0.9));
        table.push(("film_toe", |s| s.view.post_process.film_toe = 0.5));
        table.push(("film_shoulder", |s| s.view.post_process.film_shoulder = 0.3));
        table.push(("film_black_clip", |s| s.view.post_process.film_black_clip = 0.01));
        table.push(("film_white_clip", |s| s.view.post_process.film_white_clip = 0.05));
        table.push(("inverse_gamma", |s| s.view.output.inverse_gamma = Vec3::splat(0.5)));
        table.push(("output_device", |s| s.view.output.output_device = OutputDevice::SdrRec709));
        table.push(("output_gamut", |s| s.view.output.output_gamut = OutputGamut::Rec2020));
        table.push(("output_max_luminance", |s| s.view.output.output_max_luminance = 400.0));
        table.push(("reinhard_white_point", |s| s.settings.reinhard_white_point = 4.0));
        table.push(("hejl_white_point", |s| s.settings.hejl_white_point = 4.0));
        table.push(("gt7_blend_ratio", |s| s.settings.gt7_blend_ratio = 0.3));
        table.push(("gt7_fade_start", |s| s.settings.gt7_fade_start = 0.9));
        table.push(("gt7_fade_end", |s| s.settings.gt7_fade_end = 1.3));
        table.push(("lut_texture", |s| s.settings.lut_texture = Some("luts/other.cube".to_string())));
        table.push(("working_color_space", |s| {
            s.working = WorkingColorSpace::from_primaries(ColorPrimaries::REC2020)
        }));
        table.push(("working_is_srgb", |s| s.working.is_srgb = false));
        table
    }

    #[test]
    fn test_first_update_always_reports_change() {
        let scenario = Scenario::new();
        let mut cache = CachedLutSettings::default();
        assert!(scenario.update(&mut cache));
    }

    #[test]
    fn test_unchanged_inputs_are_idempotent() {
        let scenario = Scenario::new();
        let mut cache = CachedLutSettings::default();
        scenario.update(&mut cache);
        assert!(!scenario.update(&mut cache));
        assert!(!scenario.update(&mut cache));
    }

    #[test]
    fn test_every_tracked_field_triggers_change() {
        for (name, mutate) in mutations() {
            let mut scenario = Scenario::new();
            let mut cache = CachedLutSettings::default();
            scenario.update(&mut cache);
            mutate(&mut scenario);
            assert!(scenario.update(&mut cache), "mutating {name} was not detected");
            assert!(!scenario.update(&mut cache), "{name} did not settle");
        }
    }

    #[test]
    fn test_multiple_changes_fully_replace_snapshot() {
        let mut scenario = Scenario::new();
        let mut cache = CachedLutSettings::default();
        scenario.update(&mut cache);
        scenario.view.post_process.white_temp = 3200.0;
        scenario.settings.hejl_white_point = 2.0;
        scenario.cvars.color_max = 0.8;
        assert!(scenario.update(&mut cache));

        let mut fresh = CachedLutSettings::default();
        scenario.update(&mut fresh);
        assert_eq!(cache, fresh);
    }

    #[test]
    fn test_missing_working_color_space_leaves_fields_untouched() {
        let mut scenario = Scenario::new();
        let mut cache = CachedLutSettings::default();
        scenario.update(&mut cache);
        let before = cache.working_color_space;

        scenario.working = WorkingColorSpace::from_primaries(ColorPrimaries::REC2020);
        let inputs = FrameInputs {
            settings: &scenario.settings,
            cvars: &scenario.cvars,
            working_color_space: None,
            assets: &scenario.assets,
        };
        assert!(!cache.update_cached_values(&scenario.view, scenario.lut_size, &inputs));
        assert_eq!(cache.working_color_space, before);
    }

    #[test]
    fn test_missing_lut_asset_binds_black() {
        let mut scenario = Scenario::new();
        scenario.settings.lut_texture = Some("luts/not-loaded.cube".to_string());
        let mut cache = CachedLutSettings::default();
        scenario.update(&mut cache);
        assert_eq!(cache.parameters.custom.lut_texture.texture, TextureHandle::BLACK);

        scenario.settings.lut_texture = None;
        assert!(!scenario.update(&mut cache));
        assert_eq!(cache.parameters.custom.lut_texture.texture, TextureHandle::BLACK);
    }

    #[test]
    fn test_lut_asset_ignored_by_other_operators() {
        let mut scenario = Scenario::new();
        scenario.settings.operator = TonemapOperator::Reinhard;
        let mut cache = CachedLutSettings::default();
        scenario.update(&mut cache);
        assert_eq!(cache.parameters.custom.lut_texture.texture, TextureHandle::BLACK);
    }

    #[test]
    fn test_transient_view_uses_zero_key() {
        let mut scenario = Scenario::new();
        scenario.view.view_key = None;
        let mut cache = CachedLutSettings::default();
        scenario.update(&mut cache);
        assert_eq!(cache.view_key, 0);
    }

    #[test]
    fn test_polynomial_passes_through_control_points() {
        let coeffs = mapping_polynomial(0.0, 0.5, 1.0);
        let eval = |t: f32| coeffs.x * t * t + coeffs.y * t + coeffs.z;
        assert!(eval(0.0).abs() < EPSILON);
        assert!((eval(0.5) - 0.5).abs() < EPSILON);
        assert!((eval(1.0) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_polynomial_fits_arbitrary_points() {
        let coeffs = mapping_polynomial(0.1, 0.3, 0.8);
        let eval = |t: f32| coeffs.x * t * t + coeffs.y * t + coeffs.z;
        assert!((eval(0.0) - 0.1).abs() < EPSILON);
        assert!((eval(0.5) - 0.3).abs() < EPSILON);
        assert!((eval(1.0) - 0.8).abs() < EPSILON);
    }

    #[test]
    fn test_polynomial_clamps_inputs() {
        assert_eq!(mapping_polynomial(-50.0, 0.0, 50.0), mapping_polynomial(-10.0, 0.0, 10.0));
    }
}
