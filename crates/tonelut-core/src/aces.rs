//! ACES single-stage tonescale (SSTS) parameters.
//!
//! The spline is defined by a min, mid and max point in log10 space plus five
//! low and five high B-spline coefficients, derived from the display's
//! luminance range. The GPU program receives the packed form below.

use glam::Vec4;

const MIN_STOP_SDR: f32 = -6.5;
const MAX_STOP_SDR: f32 = 6.5;
const MIN_STOP_RRT: f32 = -15.0;
const MAX_STOP_RRT: f32 = 18.0;
const MIN_LUM_SDR: f32 = 0.02;
const MAX_LUM_SDR: f32 = 48.0;
const MIN_LUM_RRT: f32 = 0.0001;
const MAX_LUM_RRT: f32 = 10000.0;

const MID_GREY: f32 = 0.18;
const MID_LUMINANCE: f32 = 4.8;
const MID_SLOPE: f32 = 1.55;

/// Packed ACES tonescale parameters as consumed by the LUT program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcesTonemapParams {
    /// `(min.x, min.y, max.x, max.y)` in linear units.
    pub min_max_data: Vec4,
    /// `(mid.x, mid.y, mid.slope, 0)`.
    pub mid_data: Vec4,
    pub coefs_low_0: Vec4,
    pub coefs_high_0: Vec4,
    pub coefs_low_4: f32,
    pub coefs_high_4: f32,
    pub scene_color_multiplier: f32,
    pub gamut_compression: f32,
}

#[derive(Debug, Clone, Copy)]
struct TsPoint {
    x: f32,
    y: f32,
    slope: f32,
}

impl AcesTonemapParams {
    /// Derive the spline for a display covering `[min_lum, max_lum]` nits.
    pub fn from_display(
        min_lum: f32,
        max_lum: f32,
        scene_color_multiplier: f32,
        gamut_compression: f32,
    ) -> Self {
        let min = TsPoint {
            x: lookup_aces_min(min_lum),
            y: min_lum,
            slope: 0.0,
        };
        let mid = TsPoint {
            x: MID_GREY,
            y: MID_LUMINANCE,
            slope: MID_SLOPE,
        };
        let max = TsPoint {
            x: lookup_aces_max(max_lum),
            y: max_lum,
            slope: 0.0,
        };
        let low = coefs_low(min, mid);
        let high = coefs_high(mid, max);

        Self {
            min_max_data: Vec4::new(min.x, min.y, max.x, max.y),
            mid_data: Vec4::new(mid.x, mid.y, mid.slope, 0.0),
            coefs_low_0: Vec4::new(low[0], low[1], low[2], low[3]),
            coefs_high_0: Vec4::new(high[0], high[1], high[2], high[3]),
            coefs_low_4: low[4],
            coefs_high_4: high[4],
            scene_color_multiplier,
            gamut_compression,
        }
    }
}

impl Default for AcesTonemapParams {
    /// 1000-nit HDR reference curve, matching the neutral post-process defaults.
    fn default() -> Self {
        Self::from_display(MIN_LUM_RRT, 1000.0, 1.5, 0.0)
    }
}

fn interpolate_1d(table: [[f32; 2]; 2], p: f32) -> f32 {
    let [[x0, y0], [x1, y1]] = table;
    if p <= x0 {
        y0
    } else if p >= x1 {
        y1
    } else {
        y0 + (p - x0) / (x1 - x0) * (y1 - y0)
    }
}

fn lookup_aces_min(min_lum: f32) -> f32 {
    let table = [
        [MIN_LUM_RRT.log10(), MIN_STOP_RRT],
        [MIN_LUM_SDR.log10(), MIN_STOP_SDR],
    ];
    MID_GREY * 2f32.powf(interpolate_1d(table, min_lum.max(1e-6).log10()))
}

fn lookup_aces_max(max_lum: f32) -> f32 {
    let table = [
        [MAX_LUM_SDR.log10(), MAX_STOP_SDR],
        [MAX_LUM_RRT.log10(), MAX_STOP_RRT],
    ];
    MID_GREY * 2f32.powf(interpolate_1d(table, max_lum.max(1e-6).log10()))
}

/// Value of the linear extension through `point` at log10 position `log_x`.
fn extend(point: TsPoint, log_x: f32) -> f32 {
    point.slope * log_x + (point.y.log10() - point.slope * point.x.log10())
}

fn coefs_low(low: TsPoint, mid: TsPoint) -> [f32; 5] {
    let knot_inc = (mid.x.log10() - low.x.log10()) / 3.0;
    let bends = [[MIN_STOP_RRT, 0.18], [MIN_STOP_SDR, 0.35]];
    let pct = interpolate_1d(bends, (low.x / MID_GREY).log2());
    [
        extend(low, low.x.log10() - 0.5 * knot_inc),
        extend(low, low.x.log10() + 0.5 * knot_inc),
        low.y.log10() + pct * (mid.y.log10() - low.y.log10()),
        extend(mid, mid.x.log10() - 0.5 * knot_inc),
        extend(mid, mid.x.log10() + 0.5 * knot_inc),
    ]
}

fn coefs_high(mid: TsPoint, max: TsPoint) -> [f32; 5] {
    let knot_inc = (max.x.log10() - mid.x.log10()) / 3.0;
    let bends = [[MAX_STOP_SDR, 0.89], [MAX_STOP_RRT, 0.90]];
    let pct = interpolate_1d(bends, (max.x / MID_GREY).log2());
    [
        extend(mid, mid.x.log10() - 0.5 * knot_inc),
        extend(mid, mid.x.log10() + 0.5 * knot_inc),
        mid.y.log10() + pct * (max.y.log10() - mid.y.log10()),
        extend(max, max.x.log10() - 0.5 * knot_inc),
        extend(max, max.x.log10() + 0.5 * knot_inc),
    ]
}
