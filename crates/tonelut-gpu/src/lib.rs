//! Tonelut GPU: wgpu backend for the tonemap override LUT.
//!
//! This crate owns all GPU resources. No Bevy dependency. It implements the
//! core's recorder and target traits on top of plain wgpu, and `tonelut-bevy`
//! wraps it into ECS resources and systems.

pub mod context;
pub mod lut_renderer;
pub mod params;
pub mod textures;

use std::sync::Arc;

use thiserror::Error;
use tonelut_core::TonemapError;
use tonelut_core::texture::TextureHandle;
use tonelut_core::view::ShaderPlatform;

pub use context::{GpuContext, probe_platform, required_features};
pub use lut_renderer::{LutFrameRecorder, LutRenderer};
pub use params::LutParamsGpu;
pub use textures::{LUT_FORMAT, LutTargetPool, RegisteredTexture, TextureRegistry};

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),
    #[error("texture extent {extent:?} exceeds the device limit of {limit}")]
    TextureTooLarge { extent: [u32; 3], limit: u32 },
    #[error("LUT asset error: {0}")]
    Asset(#[from] TonemapError),
    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
}

/// Device, textures, persistent targets and pipelines in one place.
pub struct TonemapGpu {
    context: GpuContext,
    registry: Arc<TextureRegistry>,
    targets: LutTargetPool,
    renderer: LutRenderer,
}

impl TonemapGpu {
    pub fn new(context: GpuContext) -> Self {
        let registry = Arc::new(TextureRegistry::new(
            Arc::clone(&context.device),
            Arc::clone(&context.queue),
            context.float32_filterable,
        ));
        let renderer = LutRenderer::new(&context.device, context.float32_filterable);
        Self {
            targets: LutTargetPool::new(Arc::clone(&registry)),
            context,
            registry,
            renderer,
        }
    }

    /// Create a device and everything on top of it. Blocks.
    pub fn create_blocking() -> Result<Self, GpuError> {
        Ok(Self::new(GpuContext::create_blocking()?))
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn platform(&self) -> ShaderPlatform {
        self.context.platform
    }

    pub fn registry(&self) -> &Arc<TextureRegistry> {
        &self.registry
    }

    pub fn targets(&self) -> &LutTargetPool {
        &self.targets
    }

    pub fn renderer(&self) -> &LutRenderer {
        &self.renderer
    }

    /// Record LUT work into a fresh encoder and submit it.
    ///
    /// `record` gets the frame recorder and the persistent target pool, which
    /// is what the injection hooks take. Nothing is submitted if no pass was
    /// recorded.
    pub fn record<R>(
        &mut self,
        record: impl FnOnce(&mut LutFrameRecorder<'_>, &mut LutTargetPool) -> R,
    ) -> Result<R, GpuError> {
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("tonelut_frame_encoder"),
                });

        let mut recorder = LutFrameRecorder::new(&mut self.renderer, &self.registry, &mut encoder);
        let result = record(&mut recorder, &mut self.targets);
        let passes = recorder.finish()?;

        if passes > 0 {
            self.context.queue.submit(std::iter::once(encoder.finish()));
        }
        Ok(result)
    }
}
