//! Bevy resources for the tonemap override.

use bevy::prelude::*;
use tonelut_core::color_space::WorkingColorSpace;
use tonelut_core::cvars::ConsoleVariables;
use tonelut_core::hook::{InjectionStrategy, LutStatus, SkipReason, TonemapExtension};
use tonelut_core::settings::TonemapSettings;
use tonelut_core::texture::OutputTexture;
use tonelut_core::view::ViewState;
use tonelut_gpu::TonemapGpu;

/// Single source of truth for the user-facing tonemap settings.
#[derive(Resource, Default)]
pub struct TonemapSettingsState {
    pub settings: TonemapSettings,
}

/// Console variables, seeded from the environment.
#[derive(Resource)]
pub struct ConsoleVariablesState {
    pub cvars: ConsoleVariables,
}

impl Default for ConsoleVariablesState {
    fn default() -> Self {
        Self {
            cvars: ConsoleVariables::from_env(),
        }
    }
}

/// Global working color space. `None` until the host has one to offer.
#[derive(Resource)]
pub struct WorkingColorSpaceState {
    pub space: Option<WorkingColorSpace>,
}

impl Default for WorkingColorSpaceState {
    fn default() -> Self {
        Self {
            space: Some(WorkingColorSpace::srgb()),
        }
    }
}

/// The view the override renders for, plus the LUT-combine target the
/// plugin allocates on the host's behalf.
#[derive(Resource, Default)]
pub struct TonemapViewState {
    pub view: ViewState,
    pub combine_target: Option<OutputTexture>,
}

/// Where the override hooks in. Fixed for the app's lifetime.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct TonemapConfig {
    pub strategy: InjectionStrategy,
}

/// GPU backend and the view extension. Absent when no device could be created.
#[derive(Resource)]
pub struct TonemapGpuState {
    pub gpu: TonemapGpu,
    pub extension: TonemapExtension,
}

/// Per-frame outcome counters.
#[derive(Resource, Debug, Default)]
pub struct LutFrameStats {
    pub regenerated: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub last_skip: Option<SkipReason>,
}

impl LutFrameStats {
    /// Count `status`. Returns the skip reason when it differs from the
    /// previous frame's, so callers can report transitions only.
    pub fn record(&mut self, status: LutStatus) -> Option<SkipReason> {
        let skip = match status {
            LutStatus::Regenerated(_) => {
                self.regenerated += 1;
                None
            }
            LutStatus::Unchanged => {
                self.unchanged += 1;
                None
            }
            LutStatus::Skipped(reason) => {
                self.skipped += 1;
                Some(reason)
            }
        };
        let previous = std::mem::replace(&mut self.last_skip, skip);
        skip.filter(|reason| previous != Some(*reason))
    }
}
