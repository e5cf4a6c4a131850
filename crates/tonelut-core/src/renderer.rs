//! LUT render dispatch planning.
//!
//! The renderer decides the output shape, thread-group counts and draw style
//! for a LUT pass, then records it through a [`LutCommandRecorder`]. The
//! recorder owns the actual GPU API; nothing here blocks or allocates.

use tracing::debug;

use crate::cache::{CachedLutSettings, LutParameterBlock};
use crate::color_space::WorkingColorSpace;
use crate::permutation::{DispatchPath, PermutationKey, select_permutation};
use crate::texture::{LutTextureDesc, OutputTexture};

/// Compute workgroup edge length, shared with the shader.
pub const LUT_GROUP_SIZE: u32 = 8;

/// Everything a backend needs to record one LUT pass.
#[derive(Debug, Clone, Copy)]
pub struct LutPass<'a> {
    pub output: OutputTexture,
    /// `[width, height, depth]` of the region written.
    pub extent: [u32; 3],
    pub lut_size: u32,
    pub permutation: PermutationKey,
    pub path: DispatchPath,
    pub parameters: &'a LutParameterBlock,
    pub working_color_space: &'a WorkingColorSpace,
}

/// Records LUT passes into the current frame's command stream.
pub trait LutCommandRecorder {
    fn dispatch_compute(&mut self, pass: &LutPass<'_>, groups: [u32; 3]);

    /// One instanced full-screen draw per depth slice of a volume target.
    fn draw_volume_slices(&mut self, pass: &LutPass<'_>, slices: u32);

    /// A single full-screen triangle over the flattened atlas.
    fn draw_fullscreen(&mut self, pass: &LutPass<'_>);
}

/// `(size, size, size)` for volume layouts, `(size², size, 1)` otherwise.
pub const fn lut_extent(lut_size: u32, volume: bool) -> [u32; 3] {
    LutTextureDesc::for_lut(lut_size, volume, false).extent
}

/// Workgroups covering `extent`. X and Y both round the width up; Z only
/// spans depth for volume layouts.
pub const fn compute_groups(extent: [u32; 3], volume: bool) -> [u32; 3] {
    let xy = extent[0].div_ceil(LUT_GROUP_SIZE);
    [xy, xy, if volume { xy } else { 1 }]
}

/// Record the pass that regenerates `output` from the cached parameters.
///
/// Writes in place and hands the same texture back.
pub fn render_override_lut(
    recorder: &mut dyn LutCommandRecorder,
    output: OutputTexture,
    cache: &CachedLutSettings,
    path: DispatchPath,
    lut_size: u32,
) -> OutputTexture {
    let permutation = select_permutation(cache);
    let extent = lut_extent(lut_size, path.volume);
    let pass = LutPass {
        output,
        extent,
        lut_size,
        permutation,
        path,
        parameters: &cache.parameters,
        working_color_space: &cache.working_color_space,
    };

    debug!(
        %permutation,
        compute = path.compute,
        volume = path.volume,
        lut_size,
        "Recording tonemap LUT pass"
    );

    match (path.compute, path.volume) {
        (true, volume) => recorder.dispatch_compute(&pass, compute_groups(extent, volume)),
        (false, true) => recorder.draw_volume_slices(&pass, extent[2]),
        (false, false) => recorder.draw_fullscreen(&pass),
    }

    output
}
