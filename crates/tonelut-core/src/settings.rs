//! User-editable tonemapping configuration (the settings store).
//!
//! The core only ever reads these values. Hosts own the instance and may
//! persist it as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Custom tonemapping operator. Each variant is a separate shader permutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TonemapOperator {
    #[default]
    Agx,
    AgxPunchy,
    Reinhard,
    TonyMcMapface,
    Flim,
    Hejl,
    GranTurismo,
    Gt7,
    Aces,
}

impl TonemapOperator {
    /// GPU-compatible integer for the `TONEMAP_OPERATOR` permutation constant.
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::Agx => 0,
            Self::AgxPunchy => 1,
            Self::Reinhard => 2,
            Self::TonyMcMapface => 3,
            Self::Flim => 4,
            Self::Hejl => 5,
            Self::GranTurismo => 6,
            Self::Gt7 => 7,
            Self::Aces => 8,
        }
    }

    /// Human-readable label for UI menus and log lines.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Agx => "AgX",
            Self::AgxPunchy => "AgX Punchy",
            Self::Reinhard => "Reinhard",
            Self::TonyMcMapface => "Tony McMapface",
            Self::Flim => "Flim",
            Self::Hejl => "Hejl",
            Self::GranTurismo => "Gran Turismo",
            Self::Gt7 => "GT7",
            Self::Aces => "ACES",
        }
    }

    /// Whether the operator samples the external LUT texture asset.
    pub const fn uses_lut_texture(self) -> bool {
        matches!(self, Self::TonyMcMapface)
    }

    pub fn all() -> &'static [Self] {
        const ALL: [TonemapOperator; 9] = [
            TonemapOperator::Agx,
            TonemapOperator::AgxPunchy,
            TonemapOperator::Reinhard,
            TonemapOperator::TonyMcMapface,
            TonemapOperator::Flim,
            TonemapOperator::Hejl,
            TonemapOperator::GranTurismo,
            TonemapOperator::Gt7,
            TonemapOperator::Aces,
        ];
        &ALL
    }
}

/// Uniform color space used by the GT7 operator's luminance-preserving branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gt7UcsType {
    #[default]
    ICtCp,
    Jzazbz,
}

impl Gt7UcsType {
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::ICtCp => 0,
            Self::Jzazbz => 1,
        }
    }
}

/// Tonemap override settings, polled once per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TonemapSettings {
    /// Replace the host tonemapper with the custom LUT.
    pub use_custom_tonemapper: bool,
    /// Operator permutation to render.
    pub operator: TonemapOperator,
    /// Asset path of the 3D LUT sampled by TonyMcMapface.
    pub lut_texture: Option<String>,
    pub reinhard_white_point: f32,
    pub hejl_white_point: f32,
    pub gt7_ucs_type: Gt7UcsType,
    /// Blend between skewed (per-channel) and scaled (UCS) GT7 results.
    pub gt7_blend_ratio: f32,
    pub gt7_fade_start: f32,
    pub gt7_fade_end: f32,
}

impl Default for TonemapSettings {
    fn default() -> Self {
        Self {
            use_custom_tonemapper: true,
            operator: TonemapOperator::Agx,
            lut_texture: None,
            reinhard_white_point: 20.0,
            hejl_white_point: 20.0,
            gt7_ucs_type: Gt7UcsType::ICtCp,
            gt7_blend_ratio: 0.6,
            gt7_fade_start: 0.98,
            gt7_fade_end: 1.16,
        }
    }
}

impl TonemapSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Save settings as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
