//! Shader permutation and dispatch path selection.

use std::fmt;

use tracing::warn;

use crate::cache::CachedLutSettings;
use crate::settings::{Gt7UcsType, TonemapOperator};
use crate::view::{DEFAULT_WHITE_TEMP, DEFAULT_WHITE_TINT, OutputDevice, ShaderPlatform};

/// Absolute tolerance for treating white balance as the engine default.
pub const WHITE_BALANCE_TOLERANCE: f32 = 1e-4;

pub fn is_nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= WHITE_BALANCE_TOLERANCE
}

/// The four compile-time axes of the LUT program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermutationKey {
    pub output_device_srgb: bool,
    pub operator: TonemapOperator,
    pub skip_temperature: bool,
    /// Only varies for [`TonemapOperator::Gt7`]; pinned to the default otherwise.
    pub ucs_type: Gt7UcsType,
}

impl fmt::Display for PermutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} srgb={} skip_temp={} ucs={:?}",
            self.operator.label(),
            self.output_device_srgb,
            self.skip_temperature,
            self.ucs_type
        )
    }
}

/// Pick the program variant for the cached parameters.
pub fn select_permutation(cache: &CachedLutSettings) -> PermutationKey {
    let params = &cache.parameters;
    let skip_temperature = is_nearly_equal(params.white_temp, DEFAULT_WHITE_TEMP)
        && is_nearly_equal(params.white_tint, DEFAULT_WHITE_TINT);
    let ucs_type = if cache.operator == TonemapOperator::Gt7 {
        cache.gt7_ucs_type
    } else {
        Gt7UcsType::default()
    };

    PermutationKey {
        output_device_srgb: params.output.output_device == OutputDevice::SdrSrgb,
        operator: cache.operator,
        skip_temperature,
        ucs_type,
    }
}

/// Compute vs raster, volume vs flattened atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchPath {
    pub compute: bool,
    pub volume: bool,
}

impl DispatchPath {
    /// Raster pass into a flattened 2D atlas. Works everywhere.
    pub const FALLBACK: Self = Self {
        compute: false,
        volume: false,
    };

    /// Grant each requested feature only if the platform supports it.
    ///
    /// Volume output through compute only needs 3D storage writes; the raster
    /// path additionally needs per-slice routing (geometry shader or vertex layer).
    pub fn select(platform: &ShaderPlatform, wants_compute: bool, wants_volume: bool) -> Self {
        let compute = wants_compute && platform.supports_compute();
        if wants_compute && !compute {
            warn!(feature_level = ?platform.feature_level, "Compute LUT path unsupported, using raster");
        }

        let volume_capable = if compute {
            platform.volume_texture_rendering
        } else {
            platform.supports_volume_lut()
        };
        let volume = wants_volume && volume_capable;
        if wants_volume && !volume {
            warn!(backend = ?platform.backend, "Volume LUT unsupported, flattening to 2D");
        }

        Self { compute, volume }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{FeatureLevel, GraphicsBackend};

    fn cache_with(temp: f32, tint: f32) -> CachedLutSettings {
        let mut cache = CachedLutSettings::default();
        cache.parameters.white_temp = temp;
        cache.parameters.white_tint = tint;
        cache
    }

    fn bare_platform() -> ShaderPlatform {
        ShaderPlatform {
            backend: GraphicsBackend::Gl,
            feature_level: FeatureLevel::Es31,
            volume_texture_rendering: false,
            geometry_shaders: false,
            vertex_shader_layer: false,
        }
    }

    #[test]
    fn test_default_white_balance_skips_temperature() {
        assert!(select_permutation(&cache_with(6500.0, 0.0)).skip_temperature);
    }

    #[test]
    fn test_white_balance_tolerance_boundary() {
        // 6500.01 is ~1e-2 away, well outside the tolerance.
        assert!(!select_permutation(&cache_with(6500.01, 0.0)).skip_temperature);
        assert!(select_permutation(&cache_with(6500.0, 1e-5)).skip_temperature);
        assert!(!select_permutation(&cache_with(6500.0, 1e-3)).skip_temperature);
    }

    #[test]
    fn test_srgb_axis_follows_output_device() {
        let mut cache = cache_with(6500.0, 0.0);
        cache.parameters.output.output_device = OutputDevice::SdrSrgb;
        assert!(select_permutation(&cache).output_device_srgb);
        cache.parameters.output.output_device = OutputDevice::HdrAces1000NitSt2084;
        assert!(!select_permutation(&cache).output_device_srgb);
    }

    #[test]
    fn test_ucs_axis_only_varies_for_gt7() {
        let mut cache = cache_with(6500.0, 0.0);
        cache.gt7_ucs_type = Gt7UcsType::Jzazbz;
        cache.operator = TonemapOperator::Reinhard;
        assert_eq!(select_permutation(&cache).ucs_type, Gt7UcsType::ICtCp);
        cache.operator = TonemapOperator::Gt7;
        assert_eq!(select_permutation(&cache).ucs_type, Gt7UcsType::Jzazbz);
    }

    #[test]
    fn test_bare_platform_falls_back_to_raster_atlas() {
        let platform = bare_platform();
        for (compute, volume) in [(true, true), (true, false), (false, true), (false, false)] {
            assert_eq!(DispatchPath::select(&platform, compute, volume), DispatchPath::FALLBACK);
        }
    }

    #[test]
    fn test_compute_volume_needs_no_slice_routing() {
        let platform = ShaderPlatform {
            feature_level: FeatureLevel::Sm5,
            volume_texture_rendering: true,
            ..bare_platform()
        };
        assert_eq!(
            DispatchPath::select(&platform, true, true),
            DispatchPath { compute: true, volume: true }
        );
        assert_eq!(DispatchPath::select(&platform, false, true), DispatchPath::FALLBACK);
    }

    #[test]
    fn test_raster_volume_with_vertex_layer() {
        let platform = ShaderPlatform::default();
        assert_eq!(
            DispatchPath::select(&platform, false, true),
            DispatchPath { compute: false, volume: true }
        );
    }
}
