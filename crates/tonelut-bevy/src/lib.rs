//! Tonelut Bevy Plugin: runs the tonemap override LUT inside Bevy's ECS.
//!
//! Provides `TonemapOverridePlugin`, which registers the settings and console
//! variable resources, the command/outcome messages, and the per-frame system
//! that regenerates the LUT on the GPU.

pub mod events;
pub mod resources;
pub mod systems;

use bevy::prelude::*;
use tonelut_core::hook::{InjectionStrategy, TonemapExtension};
use tonelut_gpu::TonemapGpu;

use events::{LutRegenerated, LutSkipped, TonemapCommand};
use resources::{
    ConsoleVariablesState, LutFrameStats, TonemapConfig, TonemapGpuState, TonemapSettingsState,
    TonemapViewState, WorkingColorSpaceState,
};
use systems::{handle_tonemap_commands, run_tonemap_override};

/// Bevy plugin for the tonemap override.
///
/// Registers resources, messages, and systems for:
/// - Holding `TonemapSettings` and console variables as resources
/// - Creating the GPU backend and view extension at startup
/// - Regenerating the LUT each frame through the configured hook point
#[derive(Default)]
pub struct TonemapOverridePlugin {
    pub strategy: InjectionStrategy,
}

impl Plugin for TonemapOverridePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<TonemapCommand>()
            .add_message::<LutRegenerated>()
            .add_message::<LutSkipped>()
            .insert_resource(TonemapConfig {
                strategy: self.strategy,
            })
            .init_resource::<TonemapSettingsState>()
            .init_resource::<ConsoleVariablesState>()
            .init_resource::<WorkingColorSpaceState>()
            .init_resource::<TonemapViewState>()
            .init_resource::<LutFrameStats>()
            .add_systems(Startup, init_tonemap_gpu)
            .add_systems(
                Update,
                (
                    handle_tonemap_commands,
                    run_tonemap_override.after(handle_tonemap_commands),
                ),
            );
    }
}

/// Startup system: create the GPU backend and register the view extension.
fn init_tonemap_gpu(
    mut commands: Commands,
    config: Res<TonemapConfig>,
    settings: Res<TonemapSettingsState>,
    mut view_state: ResMut<TonemapViewState>,
) {
    match TonemapGpu::create_blocking() {
        Ok(gpu) => {
            tracing::info!("Tonemap LUT GPU backend initialized");
            view_state.view.shader_platform = gpu.platform();
            commands.insert_resource(TonemapGpuState {
                gpu,
                extension: TonemapExtension::new(config.strategy, &settings.settings),
            });
        }
        Err(e) => {
            tracing::error!("Failed to initialize tonemap LUT GPU backend: {e}");
            tracing::warn!("Tonemap override will not run without a GPU backend");
        }
    }
}
