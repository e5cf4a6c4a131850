//! Bevy messages for driving the tonemap override and observing its output.

use std::path::PathBuf;

use bevy::prelude::*;
use tonelut_core::hook::SkipReason;
use tonelut_core::settings::TonemapSettings;
use tonelut_core::texture::OutputTexture;

/// Inbound requests from a UI or console.
#[derive(Message, Debug, Clone)]
pub enum TonemapCommand {
    /// Replace the tonemap settings.
    SetSettings { settings: TonemapSettings },
    /// Set a console variable by name, e.g. `r.LUT.Size 64`.
    SetConsoleVariable { name: String, value: String },
    /// Parse a `.cube` file and make it resolvable under `key`.
    LoadLutAsset { key: String, path: PathBuf },
}

/// Fired when a LUT pass was recorded for the current frame.
#[derive(Message, Debug, Clone, Copy)]
pub struct LutRegenerated {
    pub texture: OutputTexture,
}

/// Fired when the override stops producing LUTs, once per transition.
#[derive(Message, Debug, Clone, Copy)]
pub struct LutSkipped {
    pub reason: SkipReason,
}
