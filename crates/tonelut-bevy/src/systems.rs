//! Bevy systems for the tonemap override.
//!
//! Commands mutate settings and console variables; once per frame the
//! override negotiates its hook point, records the LUT pass and reports
//! the outcome.

use std::sync::Arc;

use bevy::prelude::*;
use tonelut_core::cache::FrameInputs;
use tonelut_core::hook::{
    HookPoint, InjectionOutcome, InjectionStrategy, LutStatus, LutTargetProvider,
    PostProcessPass, SkipReason, TonemapExtension,
};
use tonelut_core::permutation::DispatchPath;
use tonelut_core::renderer::LutCommandRecorder;
use tonelut_core::texture::{LutTextureDesc, OutputTexture};
use tonelut_core::view::ViewState;
use tonelut_gpu::{GpuError, TextureRegistry};

use crate::events::{LutRegenerated, LutSkipped, TonemapCommand};
use crate::resources::{
    ConsoleVariablesState, LutFrameStats, TonemapConfig, TonemapGpuState, TonemapSettingsState,
    TonemapViewState, WorkingColorSpaceState,
};

/// Apply inbound commands to settings, console variables and LUT assets.
pub fn handle_tonemap_commands(
    mut commands: MessageReader<TonemapCommand>,
    mut settings: ResMut<TonemapSettingsState>,
    mut cvars: ResMut<ConsoleVariablesState>,
    gpu: Option<Res<TonemapGpuState>>,
) {
    for cmd in commands.read() {
        match cmd {
            TonemapCommand::SetSettings { settings: next } => {
                if settings.settings != *next {
                    settings.settings = next.clone();
                }
            }
            TonemapCommand::SetConsoleVariable { name, value } => {
                match cvars.cvars.set(name, value) {
                    Ok(()) => tracing::info!("{name} = {value}"),
                    Err(e) => tracing::warn!("{e}"),
                }
            }
            TonemapCommand::LoadLutAsset { key, path } => {
                let Some(gpu) = gpu.as_ref() else {
                    tracing::warn!("LoadLutAsset: no GPU backend, ignoring {}", path.display());
                    continue;
                };
                if let Err(e) = gpu.gpu.registry().load_cube_asset(key, path) {
                    tracing::warn!("LoadLutAsset {}: {e}", path.display());
                }
            }
        }
    }
}

/// Hook point the configured strategy binds to.
pub fn hook_point(strategy: InjectionStrategy) -> HookPoint {
    match strategy {
        InjectionStrategy::LutCombinePass => HookPoint::LutCombine,
        InjectionStrategy::AfterMotionBlur => HookPoint::AfterPass(PostProcessPass::MotionBlur),
    }
}

/// Negotiate, record and submit the override LUT for this frame.
#[allow(clippy::too_many_arguments)]
pub fn run_tonemap_override(
    config: Res<TonemapConfig>,
    settings: Res<TonemapSettingsState>,
    cvars: Res<ConsoleVariablesState>,
    working: Res<WorkingColorSpaceState>,
    mut view_state: ResMut<TonemapViewState>,
    mut stats: ResMut<LutFrameStats>,
    mut regenerated: MessageWriter<LutRegenerated>,
    mut skipped: MessageWriter<LutSkipped>,
    gpu: Option<ResMut<TonemapGpuState>>,
) {
    let Some(mut gpu) = gpu else {
        return;
    };
    let state = &mut *gpu;

    let status = if state
        .extension
        .negotiate(hook_point(config.strategy), &settings.settings)
    {
        let registry = Arc::clone(state.gpu.registry());
        let inputs = FrameInputs {
            settings: &settings.settings,
            cvars: &cvars.cvars,
            working_color_space: working.space.as_ref(),
            assets: registry.as_ref(),
        };
        let view_state = &mut *view_state;

        let recorded = match config.strategy {
            InjectionStrategy::LutCombinePass => {
                match ensure_combine_target(&registry, view_state, inputs.cvars.lut_size) {
                    Some(target) => state.gpu.record(|recorder, _| {
                        state
                            .extension
                            .inject_lut_combine(recorder, &view_state.view, target, &inputs)
                            .status
                    }),
                    None => Ok(LutStatus::Skipped(SkipReason::OutputTextureUnavailable)),
                }
            }
            InjectionStrategy::AfterMotionBlur => state.gpu.record(|recorder, targets| {
                inject_after_pass_frame(
                    &mut state.extension,
                    recorder,
                    targets,
                    &view_state.view,
                    &inputs,
                )
                .0
            }),
        };

        settle_submission(&mut state.extension, recorded)
    } else {
        LutStatus::Skipped(SkipReason::Disabled)
    };

    if let LutStatus::Regenerated(texture) = status {
        regenerated.write(LutRegenerated { texture });
    }
    if let Some(reason) = stats.record(status) {
        tracing::debug!(%reason, "Tonemap override skipped");
        skipped.write(LutSkipped { reason });
    }
}

/// Run the after-pass injection on this frame's copy of `authored`.
///
/// The injection neutralizes the view it is given. The authored view keeps
/// the user's grading for the next frame; the neutralized copy is returned.
pub fn inject_after_pass_frame(
    extension: &mut TonemapExtension,
    recorder: &mut dyn LutCommandRecorder,
    targets: &mut dyn LutTargetProvider,
    authored: &ViewState,
    inputs: &FrameInputs<'_>,
) -> (LutStatus, ViewState) {
    let mut frame_view = authored.clone();
    let InjectionOutcome { status, .. } =
        extension.inject_after_pass(recorder, targets, &mut frame_view, (), inputs);
    (status, frame_view)
}

/// Frame status from a submission result. Recorded work that never reached
/// the GPU leaves the target stale, so the cache is dropped.
fn settle_submission(
    extension: &mut TonemapExtension,
    recorded: Result<LutStatus, GpuError>,
) -> LutStatus {
    match recorded {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("Tonemap LUT submission failed: {e}");
            extension.invalidate_cache();
            LutStatus::Skipped(SkipReason::OutputTextureUnavailable)
        }
    }
}

/// The LUT-combine target for the current size and dispatch path, reallocated
/// when either changes.
fn ensure_combine_target(
    registry: &TextureRegistry,
    view_state: &mut TonemapViewState,
    lut_size: u32,
) -> Option<OutputTexture> {
    let platform = view_state.view.shader_platform;
    let path = DispatchPath::select(
        &platform,
        view_state.view.use_compute_passes,
        platform.supports_volume_lut(),
    );
    let desc = LutTextureDesc::for_lut(lut_size, path.volume, path.compute);

    if let Some(target) = view_state.combine_target
        && target.desc == desc
    {
        return Some(target);
    }

    if let Some(old) = view_state.combine_target.take() {
        registry.remove(old.handle);
    }
    match registry.create_lut_target(&desc) {
        Ok(target) => {
            view_state.combine_target = Some(target);
            Some(target)
        }
        Err(e) => {
            tracing::error!("LUT Texture register/creation failed: {e}");
            None
        }
    }
}
