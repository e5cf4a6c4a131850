//! Console variables polled by the LUT pipeline.
//!
//! Values are addressed by their engine-style names (`r.LUT.Size`, ...) so a
//! host console can forward `name value` commands straight to [`ConsoleVariables::set`].

use crate::error::{Result, TonemapError};

pub const COLOR_MIN: &str = "r.Color.Min";
pub const COLOR_MID: &str = "r.Color.Mid";
pub const COLOR_MAX: &str = "r.Color.Max";
pub const LUT_SIZE: &str = "r.LUT.Size";
pub const LUT_UPDATE_EVERY_FRAME: &str = "r.LUT.UpdateEveryFrame";
pub const ACES_SCENE_COLOR_MULTIPLIER: &str = "r.HDR.Aces.SceneColorMultiplier";
pub const ACES_GAMUT_COMPRESSION: &str = "r.HDR.Aces.GamutCompression";

const DEFAULT_LUT_SIZE: u32 = 32;
const MIN_LUT_SIZE: u32 = 2;
const MAX_LUT_SIZE: u32 = 256;

/// Tunables that influence LUT contents or regeneration frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleVariables {
    /// Color response at black, clamped to `[-10, 10]` when used.
    pub color_min: f32,
    /// Color response at mid-grey.
    pub color_mid: f32,
    /// Color response at white.
    pub color_max: f32,
    /// LUT resolution per axis.
    pub lut_size: u32,
    /// Regenerate the LUT every frame even when nothing changed.
    pub update_every_frame: bool,
    pub aces_scene_color_multiplier: f32,
    pub aces_gamut_compression: f32,
}

impl Default for ConsoleVariables {
    fn default() -> Self {
        Self {
            color_min: 0.0,
            color_mid: 0.5,
            color_max: 1.0,
            lut_size: DEFAULT_LUT_SIZE,
            update_every_frame: false,
            aces_scene_color_multiplier: 1.5,
            aces_gamut_compression: 0.0,
        }
    }
}

impl ConsoleVariables {
    /// Defaults overridden by `TONELUT_LUT_SIZE` and `TONELUT_UPDATE_EVERY_FRAME`.
    ///
    /// Unparseable environment values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut vars = Self::default();
        for (env, name) in [
            ("TONELUT_LUT_SIZE", LUT_SIZE),
            ("TONELUT_UPDATE_EVERY_FRAME", LUT_UPDATE_EVERY_FRAME),
        ] {
            if let Ok(value) = std::env::var(env)
                && let Err(e) = vars.set(name, &value)
            {
                tracing::warn!("ignoring {env}: {e}");
            }
        }
        vars
    }

    /// Set a variable by name from its string form.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match name {
            COLOR_MIN => self.color_min = parse_f32(COLOR_MIN, value)?,
            COLOR_MID => self.color_mid = parse_f32(COLOR_MID, value)?,
            COLOR_MAX => self.color_max = parse_f32(COLOR_MAX, value)?,
            ACES_SCENE_COLOR_MULTIPLIER => {
                self.aces_scene_color_multiplier = parse_f32(ACES_SCENE_COLOR_MULTIPLIER, value)?
            }
            ACES_GAMUT_COMPRESSION => {
                self.aces_gamut_compression = parse_f32(ACES_GAMUT_COMPRESSION, value)?
            }
            LUT_SIZE => {
                let size: u32 = value.parse().map_err(|_| TonemapError::InvalidValue {
                    name: LUT_SIZE,
                    value: value.to_string(),
                })?;
                if !(MIN_LUT_SIZE..=MAX_LUT_SIZE).contains(&size) {
                    return Err(TonemapError::InvalidLutSize(size));
                }
                self.lut_size = size;
            }
            LUT_UPDATE_EVERY_FRAME => {
                let flag: i32 = value.parse().map_err(|_| TonemapError::InvalidValue {
                    name: LUT_UPDATE_EVERY_FRAME,
                    value: value.to_string(),
                })?;
                self.update_every_frame = flag > 0;
            }
            other => return Err(TonemapError::UnknownVariable(other.to_string())),
        }
        Ok(())
    }

    /// Current value of a variable formatted for console echo.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            COLOR_MIN => self.color_min.to_string(),
            COLOR_MID => self.color_mid.to_string(),
            COLOR_MAX => self.color_max.to_string(),
            LUT_SIZE => self.lut_size.to_string(),
            LUT_UPDATE_EVERY_FRAME => u32::from(self.update_every_frame).to_string(),
            ACES_SCENE_COLOR_MULTIPLIER => self.aces_scene_color_multiplier.to_string(),
            ACES_GAMUT_COMPRESSION => self.aces_gamut_compression.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn parse_f32(name: &'static str, value: &str) -> Result<f32> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TonemapError::InvalidValue {
            name,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_by_name() {
        let mut vars = ConsoleVariables::default();
        vars.set(LUT_SIZE, "64").expect("valid size");
        vars.set(COLOR_MID, " 0.45 ").expect("valid float");
        vars.set(LUT_UPDATE_EVERY_FRAME, "1").expect("valid flag");
        assert_eq!(vars.lut_size, 64);
        assert_eq!(vars.color_mid, 0.45);
        assert!(vars.update_every_frame);
        assert_eq!(vars.get(LUT_UPDATE_EVERY_FRAME).as_deref(), Some("1"));
    }

    #[test]
    fn test_rejects_unknown_and_invalid() {
        let mut vars = ConsoleVariables::default();
        assert!(matches!(
            vars.set("r.Nope", "1"),
            Err(TonemapError::UnknownVariable(_))
        ));
        assert!(matches!(
            vars.set(LUT_SIZE, "1"),
            Err(TonemapError::InvalidLutSize(1))
        ));
        assert!(matches!(
            vars.set(COLOR_MAX, "nan"),
            Err(TonemapError::InvalidValue { .. })
        ));
        assert_eq!(vars, ConsoleVariables::default());
    }
}
