//! Multi-frame behavior of the override through the public API only.

use tonelut_core::cache::FrameInputs;
use tonelut_core::color_space::WorkingColorSpace;
use tonelut_core::cvars::{self, ConsoleVariables};
use tonelut_core::hook::{
    HookPoint, InjectionStrategy, LutStatus, LutTargetProvider, PostProcessPass, SkipReason,
    TonemapExtension,
};
use tonelut_core::permutation::{DispatchPath, PermutationKey};
use tonelut_core::renderer::{LutCommandRecorder, LutPass};
use tonelut_core::settings::{Gt7UcsType, TonemapOperator, TonemapSettings};
use tonelut_core::texture::{LutTextureDesc, NoAssets, OutputTexture, TextureHandle};
use tonelut_core::view::{FeatureLevel, SceneCaptureSource, ViewState};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pass {
    permutation: PermutationKey,
    path: DispatchPath,
    extent: [u32; 3],
}

#[derive(Default)]
struct Frame {
    passes: Vec<Pass>,
}

impl Frame {
    fn push(&mut self, pass: &LutPass<'_>) {
        self.passes.push(Pass {
            permutation: pass.permutation,
            path: pass.path,
            extent: pass.extent,
        });
    }
}

impl LutCommandRecorder for Frame {
    fn dispatch_compute(&mut self, pass: &LutPass<'_>, _groups: [u32; 3]) {
        self.push(pass);
    }

    fn draw_volume_slices(&mut self, pass: &LutPass<'_>, _slices: u32) {
        self.push(pass);
    }

    fn draw_fullscreen(&mut self, pass: &LutPass<'_>) {
        self.push(pass);
    }
}

/// Host view-state slots: one persistent LUT per view key.
#[derive(Default)]
struct Slots {
    next: u64,
    held: Option<OutputTexture>,
}

impl LutTargetProvider for Slots {
    fn register_persistent_lut(
        &mut self,
        view: &ViewState,
        desc: &LutTextureDesc,
    ) -> Option<OutputTexture> {
        view.view_key?;
        if let Some(held) = self.held
            && held.desc == *desc
        {
            return Some(held);
        }
        self.next += 1;
        let target = OutputTexture {
            handle: TextureHandle(self.next),
            desc: *desc,
        };
        self.held = Some(target);
        Some(target)
    }
}

struct Host {
    settings: TonemapSettings,
    cvars: ConsoleVariables,
    working: WorkingColorSpace,
    view: ViewState,
}

impl Host {
    fn new() -> Self {
        Self {
            settings: TonemapSettings::default(),
            cvars: ConsoleVariables::default(),
            working: WorkingColorSpace::srgb(),
            view: ViewState::default(),
        }
    }

    fn combine_frame(
        &self,
        ext: &mut TonemapExtension,
        output: OutputTexture,
    ) -> (LutStatus, Frame) {
        let mut frame = Frame::default();
        if !ext.negotiate(HookPoint::LutCombine, &self.settings) {
            return (LutStatus::Skipped(SkipReason::Disabled), frame);
        }
        let inputs = FrameInputs {
            settings: &self.settings,
            cvars: &self.cvars,
            working_color_space: Some(&self.working),
            assets: &NoAssets,
        };
        let outcome = ext.inject_lut_combine(&mut frame, &self.view, output, &inputs);
        assert_eq!(outcome.output, output);
        (outcome.status, frame)
    }

    /// One after-pass frame on a fresh copy of the authored view, which is
    /// returned as the rest of the frame would see it.
    fn after_pass_frame(
        &self,
        ext: &mut TonemapExtension,
        slots: &mut Slots,
    ) -> (LutStatus, Frame, ViewState) {
        let mut frame = Frame::default();
        let mut view = self.view.clone();
        let point = HookPoint::AfterPass(PostProcessPass::MotionBlur);
        if !ext.negotiate(point, &self.settings) {
            return (LutStatus::Skipped(SkipReason::Disabled), frame, view);
        }
        let inputs = FrameInputs {
            settings: &self.settings,
            cvars: &self.cvars,
            working_color_space: Some(&self.working),
            assets: &NoAssets,
        };
        let outcome = ext.inject_after_pass(&mut frame, slots, &mut view, 42u8, &inputs);
        assert_eq!(outcome.output, 42);
        (outcome.status, frame, view)
    }
}

fn combine_target(size: u32) -> OutputTexture {
    OutputTexture {
        handle: TextureHandle(100),
        desc: LutTextureDesc::for_lut(size, true, true),
    }
}

#[test]
fn test_lut_combine_regenerates_only_on_change() {
    let mut host = Host::new();
    let mut ext = TonemapExtension::new(InjectionStrategy::LutCombinePass, &host.settings);
    let target = combine_target(32);

    let (status, frame) = host.combine_frame(&mut ext, target);
    assert_eq!(status, LutStatus::Regenerated(target));
    assert_eq!(frame.passes.len(), 1);
    let first = frame.passes[0];
    assert!(first.permutation.skip_temperature);
    assert_eq!(first.path, DispatchPath { compute: true, volume: true });
    assert_eq!(first.extent, [32, 32, 32]);

    let (status, frame) = host.combine_frame(&mut ext, target);
    assert_eq!(status, LutStatus::Unchanged);
    assert!(frame.passes.is_empty());

    // White balance away from the default flips the temperature axis.
    host.view.post_process.white_temp = 5000.0;
    let (status, frame) = host.combine_frame(&mut ext, target);
    assert_eq!(status, LutStatus::Regenerated(target));
    assert!(!frame.passes[0].permutation.skip_temperature);

    // A forced refresh records even when nothing moved.
    host.cvars
        .set(cvars::LUT_UPDATE_EVERY_FRAME, "1")
        .expect("valid cvar");
    let (status, _) = host.combine_frame(&mut ext, target);
    assert_eq!(status, LutStatus::Regenerated(target));
}

#[test]
fn test_operator_switch_selects_new_permutation() {
    let mut host = Host::new();
    let mut ext = TonemapExtension::new(InjectionStrategy::LutCombinePass, &host.settings);
    let target = combine_target(16);
    host.combine_frame(&mut ext, target);

    host.settings.operator = TonemapOperator::Gt7;
    host.settings.gt7_ucs_type = Gt7UcsType::Jzazbz;
    let (_, frame) = host.combine_frame(&mut ext, target);
    let key = frame.passes[0].permutation;
    assert_eq!(key.operator, TonemapOperator::Gt7);
    assert_eq!(key.ucs_type, Gt7UcsType::Jzazbz);

    // UCS only varies for GT7.
    host.settings.operator = TonemapOperator::Hejl;
    let (_, frame) = host.combine_frame(&mut ext, target);
    assert_eq!(frame.passes[0].permutation.ucs_type, Gt7UcsType::ICtCp);
}

#[test]
fn test_toggling_override_tracks_each_transition() {
    let mut host = Host::new();
    let mut ext = TonemapExtension::new(InjectionStrategy::LutCombinePass, &host.settings);
    let target = combine_target(16);
    assert!(ext.cached_override());

    host.settings.use_custom_tonemapper = false;
    let (status, frame) = host.combine_frame(&mut ext, target);
    assert_eq!(status, LutStatus::Skipped(SkipReason::Disabled));
    assert!(frame.passes.is_empty());
    assert!(!ext.cached_override());

    // Staying disabled is not another transition.
    host.combine_frame(&mut ext, target);
    assert!(!ext.cached_override());

    host.settings.use_custom_tonemapper = true;
    let (status, _) = host.combine_frame(&mut ext, target);
    assert_eq!(status, LutStatus::Regenerated(target));
    assert!(ext.cached_override());
}

#[test]
fn test_after_pass_always_renders_into_view_slot() {
    let mut host = Host::new();
    host.view.post_process.white_temp = 4500.0;
    let mut ext = TonemapExtension::new(InjectionStrategy::AfterMotionBlur, &host.settings);
    let mut slots = Slots::default();

    for _ in 0..3 {
        let (status, frame, view) = host.after_pass_frame(&mut ext, &mut slots);
        let held = slots.held.expect("slot allocated");
        assert_eq!(status, LutStatus::Regenerated(held));
        assert_eq!(frame.passes.len(), 1);
        assert!(!view.color_grading);
        // Grading is neutralized per frame only; the authored view still drives the LUT.
        assert_eq!(ext.cache().parameters.white_temp, 4500.0);
    }
    assert_eq!(slots.next, 1, "slot reused across frames");

    // The hook ignores the LUT-combine point under this strategy.
    assert!(!ext.negotiate(HookPoint::LutCombine, &host.settings));
}

#[test]
fn test_after_pass_degrades_on_limited_platforms() {
    let mut host = Host::new();
    host.view.shader_platform.feature_level = FeatureLevel::Es31;
    host.view.shader_platform.volume_texture_rendering = false;
    let mut ext = TonemapExtension::new(InjectionStrategy::AfterMotionBlur, &host.settings);
    let mut slots = Slots::default();

    let (_, frame, _) = host.after_pass_frame(&mut ext, &mut slots);
    let pass = frame.passes[0];
    assert_eq!(pass.path, DispatchPath::FALLBACK);
    let size = host.cvars.lut_size;
    assert_eq!(pass.extent, [size * size, size, 1]);
}

#[test]
fn test_after_pass_skips_float_capture_and_transient_views() {
    let mut host = Host::new();
    let mut ext = TonemapExtension::new(InjectionStrategy::AfterMotionBlur, &host.settings);
    let mut slots = Slots::default();

    host.view.scene_capture_source = SceneCaptureSource::FinalColorHdr;
    let (status, frame, _) = host.after_pass_frame(&mut ext, &mut slots);
    assert_eq!(status, LutStatus::Skipped(SkipReason::FloatOutputMismatch));
    assert!(frame.passes.is_empty());

    host.view.scene_capture_source = SceneCaptureSource::FinalColorLdr;
    host.view.view_key = None;
    let (status, frame, view) = host.after_pass_frame(&mut ext, &mut slots);
    assert_eq!(status, LutStatus::Skipped(SkipReason::OutputTextureUnavailable));
    assert!(frame.passes.is_empty());
    assert!(view.color_grading, "skipped frames leave grading intact");
}
