//! GPU-side uniform layout for the LUT program.
//!
//! Every member is a 16-byte vector so the Rust and WGSL layouts agree
//! without explicit padding.

use bytemuck::{Pod, Zeroable};
use glam::Mat3;
use tonelut_core::renderer::LutPass;
use tonelut_core::view::ColorGradeRange;

/// Mirror of `LutParams` in `tonemap_lut.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LutParamsGpu {
    /// Columns of `to_xyz`, `from_xyz`, `to_ap1`, `from_ap1`, `to_ap0`.
    pub working: [[f32; 4]; 15],
    pub aces_min_max: [f32; 4],
    pub aces_mid: [f32; 4],
    pub aces_coefs_low: [f32; 4],
    pub aces_coefs_high: [f32; 4],
    /// `(coefs_low_4, coefs_high_4, scene_color_multiplier, gamut_compression)`.
    pub aces_misc: [f32; 4],
    pub color_scale: [f32; 4],
    pub overlay_color: [f32; 4],
    /// Global, shadows, midtones, highlights; each saturation, contrast, gamma, gain, offset.
    pub grading: [[f32; 4]; 20],
    /// `(shadows_max, highlights_min, highlights_max, tone_curve_amount)`.
    pub tone_ranges: [f32; 4],
    /// `(white_temp, white_tint, is_white_balance, blue_correction)`.
    pub white_balance: [f32; 4],
    /// `(slope, toe, shoulder, black_clip)`.
    pub film: [f32; 4],
    /// `(white_clip, expand_gamut, output_max_luminance, 0)`.
    pub film_ext: [f32; 4],
    pub inverse_gamma: [f32; 4],
    /// `(a, b, c, 0)` of the color mapping polynomial.
    pub mapping_polynomial: [f32; 4],
    /// `(reinhard_white_point, hejl_white_point, gt7_blend_ratio, gt7_fade_start)`.
    pub custom: [f32; 4],
    /// `(gt7_fade_end, 0, 0, 0)`.
    pub custom_ext: [f32; 4],
    /// `(output_device, output_gamut, lut_size, working_is_srgb)`.
    pub output: [u32; 4],
}

fn columns(m: &Mat3) -> [[f32; 4]; 3] {
    [
        m.x_axis.extend(0.0).to_array(),
        m.y_axis.extend(0.0).to_array(),
        m.z_axis.extend(0.0).to_array(),
    ]
}

fn range(r: &ColorGradeRange) -> [[f32; 4]; 5] {
    [
        r.saturation.to_array(),
        r.contrast.to_array(),
        r.gamma.to_array(),
        r.gain.to_array(),
        r.offset.to_array(),
    ]
}

impl LutParamsGpu {
    pub fn from_pass(pass: &LutPass<'_>) -> Self {
        let p = pass.parameters;
        let ws = pass.working_color_space;

        let mut working = [[0.0; 4]; 15];
        for (i, m) in [ws.to_xyz, ws.from_xyz, ws.to_ap1, ws.from_ap1, ws.to_ap0]
            .iter()
            .enumerate()
        {
            working[i * 3..i * 3 + 3].copy_from_slice(&columns(m));
        }

        let mut grading = [[0.0; 4]; 20];
        for (i, r) in [&p.global, &p.shadows, &p.midtones, &p.highlights]
            .into_iter()
            .enumerate()
        {
            grading[i * 5..i * 5 + 5].copy_from_slice(&range(r));
        }

        let custom = &p.custom;
        Self {
            working,
            aces_min_max: p.aces.min_max_data.to_array(),
            aces_mid: p.aces.mid_data.to_array(),
            aces_coefs_low: p.aces.coefs_low_0.to_array(),
            aces_coefs_high: p.aces.coefs_high_0.to_array(),
            aces_misc: [
                p.aces.coefs_low_4,
                p.aces.coefs_high_4,
                p.aces.scene_color_multiplier,
                p.aces.gamut_compression,
            ],
            color_scale: p.color_scale.extend(1.0).to_array(),
            overlay_color: p.overlay_color.to_array(),
            grading,
            tone_ranges: [
                p.shadows_max,
                p.highlights_min,
                p.highlights_max,
                p.tone_curve_amount,
            ],
            white_balance: [
                p.white_temp,
                p.white_tint,
                if p.is_temperature_white_balance { 1.0 } else { 0.0 },
                p.blue_correction,
            ],
            film: [p.film_slope, p.film_toe, p.film_shoulder, p.film_black_clip],
            film_ext: [
                p.film_white_clip,
                p.expand_gamut,
                p.output.output_max_luminance,
                0.0,
            ],
            inverse_gamma: p.output.inverse_gamma.extend(0.0).to_array(),
            mapping_polynomial: p.mapping_polynomial.extend(0.0).to_array(),
            custom: [
                custom.reinhard_white_point,
                custom.hejl_white_point,
                custom.gt7_blend_ratio,
                custom.gt7_fade_start,
            ],
            custom_ext: [custom.gt7_fade_end, 0.0, 0.0, 0.0],
            output: [
                p.output.output_device.to_u32(),
                p.output.output_gamut.to_u32(),
                pass.lut_size,
                u32::from(ws.is_srgb),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_is_vec4_aligned() {
        assert_eq!(std::mem::size_of::<LutParamsGpu>() % 16, 0);
        // 15 + 5 + 2 + 20 + 8 rows plus the u32 row.
        assert_eq!(std::mem::size_of::<LutParamsGpu>(), 51 * 16);
    }
}
