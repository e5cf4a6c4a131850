//! Injection into the host's post-processing graph.
//!
//! The host owns the call graph. Each frame it asks [`TonemapExtension::negotiate`]
//! whether to include the extension at a given hook point, then calls the
//! matching `inject_*` method. Only one strategy is active per extension,
//! chosen at construction.
//!
//! - [`InjectionStrategy::LutCombinePass`]: the host exposes its LUT-combine
//!   stage and hands over the LUT target it allocated. The LUT is only
//!   re-recorded when the cached parameters changed.
//! - [`InjectionStrategy::AfterMotionBlur`]: the extension rides on the
//!   motion-blur after-pass, writes the view's persistent LUT slot itself and
//!   neutralizes the view so the stock LUT stage has nothing to redo.

use tracing::{debug, error, info, warn};

use crate::cache::{CachedLutSettings, FrameInputs};
use crate::permutation::DispatchPath;
use crate::renderer::{LutCommandRecorder, render_override_lut};
use crate::settings::TonemapSettings;
use crate::texture::{LutTextureDesc, OutputTexture};
use crate::view::ViewState;

/// Which host extension point the extension binds to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InjectionStrategy {
    /// Direct LUT-combine callback. Requires a host that exposes the stage.
    #[default]
    LutCombinePass,
    /// Generic after-pass callback on motion blur, for stock hosts.
    AfterMotionBlur,
}

/// Post-processing passes a host may offer after-pass callbacks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessPass {
    MotionBlur,
    Tonemap,
    Fxaa,
    VisualizeDepthOfField,
}

/// A point at which the host offers to call the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    LutCombine,
    AfterPass(PostProcessPass),
}

/// Why the override did not apply this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("LUT texture register/creation failed")]
    OutputTextureUnavailable,
    #[error("float output expectation does not match the scene capture source")]
    FloatOutputMismatch,
    #[error("custom tonemapper is disabled")]
    Disabled,
}

/// What happened to the LUT during an injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LutStatus {
    /// A pass was recorded into this target.
    Regenerated(OutputTexture),
    /// Parameters matched the previous frame; the target keeps its contents.
    Unchanged,
    Skipped(SkipReason),
}

/// Result of an injection: the handle the host continues with plus the LUT status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionOutcome<T> {
    pub output: T,
    pub status: LutStatus,
}

/// Locates or creates the persistent per-view LUT slot the stock pipeline reads.
pub trait LutTargetProvider {
    /// `None` when the view has no persistent state or allocation failed.
    fn register_persistent_lut(
        &mut self,
        view: &ViewState,
        desc: &LutTextureDesc,
    ) -> Option<OutputTexture>;
}

/// The tonemap override extension for one render context.
#[derive(Debug)]
pub struct TonemapExtension {
    strategy: InjectionStrategy,
    cache: CachedLutSettings,
    cached_override: bool,
}

impl TonemapExtension {
    pub fn new(strategy: InjectionStrategy, settings: &TonemapSettings) -> Self {
        info!(?strategy, "Tonemap view extension registered");
        Self {
            strategy,
            cache: CachedLutSettings::default(),
            cached_override: settings.use_custom_tonemapper,
        }
    }

    pub fn strategy(&self) -> InjectionStrategy {
        self.strategy
    }

    pub fn cache(&self) -> &CachedLutSettings {
        &self.cache
    }

    /// The custom-tonemapper setting as last seen by LUT-combine negotiation.
    pub fn cached_override(&self) -> bool {
        self.cached_override
    }

    /// Force the next injection to record a pass. Hosts call this when the
    /// recorded work never reached the GPU.
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    /// Whether the host should include this extension at `point` for this frame.
    pub fn negotiate(&mut self, point: HookPoint, settings: &TonemapSettings) -> bool {
        match (self.strategy, point) {
            (InjectionStrategy::LutCombinePass, HookPoint::LutCombine) => {
                if self.cached_override != settings.use_custom_tonemapper {
                    warn!("Manually refresh postprocess settings");
                    self.cached_override = settings.use_custom_tonemapper;
                }
                settings.use_custom_tonemapper
            }
            (
                InjectionStrategy::AfterMotionBlur,
                HookPoint::AfterPass(PostProcessPass::MotionBlur),
            ) => settings.use_custom_tonemapper,
            _ => false,
        }
    }

    /// LUT-combine callback. `output` is the target the host allocated; its
    /// descriptor decides the dispatch path and LUT size.
    pub fn inject_lut_combine(
        &mut self,
        recorder: &mut dyn LutCommandRecorder,
        view: &ViewState,
        output: OutputTexture,
        inputs: &FrameInputs<'_>,
    ) -> InjectionOutcome<OutputTexture> {
        let path = DispatchPath {
            compute: output.desc.storage_binding,
            volume: output.desc.is_volume(),
        };
        let lut_size = output.desc.lut_size();

        let changed = self.cache.update_cached_values(view, lut_size, inputs);
        if !changed && !inputs.cvars.update_every_frame {
            debug!("Tonemap LUT parameters unchanged");
            return InjectionOutcome {
                output,
                status: LutStatus::Unchanged,
            };
        }

        let written = render_override_lut(recorder, output, &self.cache, path, lut_size);
        InjectionOutcome {
            output: written,
            status: LutStatus::Regenerated(written),
        }
    }

    /// Motion-blur after-pass callback. Always hands `scene_color` back
    /// untouched; the LUT goes into the view's persistent slot.
    pub fn inject_after_pass<T>(
        &mut self,
        recorder: &mut dyn LutCommandRecorder,
        targets: &mut dyn LutTargetProvider,
        view: &mut ViewState,
        scene_color: T,
        inputs: &FrameInputs<'_>,
    ) -> InjectionOutcome<T> {
        // The override only produces non-float LUTs.
        let float_output = false;
        if float_output != view.scene_capture_source.requires_float_output() {
            info!(source = ?view.scene_capture_source, "Use float output not consistent");
            return skipped(scene_color, SkipReason::FloatOutputMismatch);
        }

        let path = DispatchPath::select(
            &view.shader_platform,
            view.use_compute_passes,
            view.shader_platform.supports_volume_lut(),
        );
        let lut_size = inputs.cvars.lut_size;
        let desc = LutTextureDesc::for_lut(lut_size, path.volume, path.compute);

        let Some(output) = targets.register_persistent_lut(view, &desc) else {
            error!(view_key = ?view.view_key, "LUT Texture register/creation failed");
            return skipped(scene_color, SkipReason::OutputTextureUnavailable);
        };

        // The stock LUT stage may overwrite the slot later in the frame, so
        // the pass is recorded whether or not anything changed.
        let changed = self.cache.update_cached_values(view, lut_size, inputs);
        debug!(changed, "Overriding persistent tonemap LUT");

        view.neutralize_color_grading();

        let written = render_override_lut(recorder, output, &self.cache, path, lut_size);
        InjectionOutcome {
            output: scene_color,
            status: LutStatus::Regenerated(written),
        }
    }
}

fn skipped<T>(output: T, reason: SkipReason) -> InjectionOutcome<T> {
    InjectionOutcome {
        output,
        status: LutStatus::Skipped(reason),
    }
}
