//! Working color space definitions and the matrices the LUT program consumes.
//!
//! All matrices act on column vectors (`m * rgb`). Conversions into the ACES
//! spaces include a Bradford adaptation from the working white point to the
//! ACES white point.

use glam::{Mat3, Vec3};

/// CIE xy chromaticity coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromaticity {
    pub x: f32,
    pub y: f32,
}

impl Chromaticity {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// XYZ tristimulus with `Y = 1`.
    fn to_xyz(self) -> Vec3 {
        Vec3::new(self.x / self.y, 1.0, (1.0 - self.x - self.y) / self.y)
    }
}

pub const WHITE_D65: Chromaticity = Chromaticity::new(0.3127, 0.3290);
pub const WHITE_ACES: Chromaticity = Chromaticity::new(0.32168, 0.33767);

/// Red, green and blue primaries plus the white point of an RGB space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPrimaries {
    pub red: Chromaticity,
    pub green: Chromaticity,
    pub blue: Chromaticity,
    pub white: Chromaticity,
}

impl ColorPrimaries {
    pub const SRGB: Self = Self {
        red: Chromaticity::new(0.64, 0.33),
        green: Chromaticity::new(0.30, 0.60),
        blue: Chromaticity::new(0.15, 0.06),
        white: WHITE_D65,
    };

    pub const REC2020: Self = Self {
        red: Chromaticity::new(0.708, 0.292),
        green: Chromaticity::new(0.170, 0.797),
        blue: Chromaticity::new(0.131, 0.046),
        white: WHITE_D65,
    };

    pub const DISPLAY_P3: Self = Self {
        red: Chromaticity::new(0.680, 0.320),
        green: Chromaticity::new(0.265, 0.690),
        blue: Chromaticity::new(0.150, 0.060),
        white: WHITE_D65,
    };

    /// ACES AP1 (ACEScg).
    pub const ACES_AP1: Self = Self {
        red: Chromaticity::new(0.713, 0.293),
        green: Chromaticity::new(0.165, 0.830),
        blue: Chromaticity::new(0.128, 0.044),
        white: WHITE_ACES,
    };

    /// ACES AP0 (ACES2065-1).
    pub const ACES_AP0: Self = Self {
        red: Chromaticity::new(0.7347, 0.2653),
        green: Chromaticity::new(0.0, 1.0),
        blue: Chromaticity::new(0.0001, -0.0770),
        white: WHITE_ACES,
    };

    /// Normalized primary matrix: linear RGB to CIE XYZ.
    pub fn rgb_to_xyz(&self) -> Mat3 {
        let primaries = Mat3::from_cols(self.red.to_xyz(), self.green.to_xyz(), self.blue.to_xyz());
        let scale = primaries.inverse() * self.white.to_xyz();
        primaries * Mat3::from_diagonal(scale)
    }
}

/// Bradford chromatic adaptation between two white points, in XYZ.
pub fn bradford_adaptation(from: Chromaticity, to: Chromaticity) -> Mat3 {
    let bradford = Mat3::from_cols_array_2d(&[
        [0.8951, 0.2664, -0.1614],
        [-0.7502, 1.7135, 0.0367],
        [0.0389, -0.0685, 1.0296],
    ])
    .transpose();
    let src = bradford * from.to_xyz();
    let dst = bradford * to.to_xyz();
    bradford.inverse() * Mat3::from_diagonal(dst / src) * bradford
}

/// Snapshot of the global working color space transform.
///
/// Compared field-by-field by the parameter cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingColorSpace {
    pub to_xyz: Mat3,
    pub from_xyz: Mat3,
    pub to_ap1: Mat3,
    pub from_ap1: Mat3,
    pub to_ap0: Mat3,
    pub is_srgb: bool,
}

impl WorkingColorSpace {
    pub fn from_primaries(primaries: ColorPrimaries) -> Self {
        let to_xyz = primaries.rgb_to_xyz();
        let adapt = bradford_adaptation(primaries.white, WHITE_ACES);
        let to_ap1 = ColorPrimaries::ACES_AP1.rgb_to_xyz().inverse() * adapt * to_xyz;
        let to_ap0 = ColorPrimaries::ACES_AP0.rgb_to_xyz().inverse() * adapt * to_xyz;
        Self {
            to_xyz,
            from_xyz: to_xyz.inverse(),
            to_ap1,
            from_ap1: to_ap1.inverse(),
            to_ap0,
            is_srgb: primaries == ColorPrimaries::SRGB,
        }
    }

    /// sRGB / Rec.709 primaries, the default working space.
    pub fn srgb() -> Self {
        Self::from_primaries(ColorPrimaries::SRGB)
    }
}

impl Default for WorkingColorSpace {
    fn default() -> Self {
        Self::srgb()
    }
}
