//! Tonelut Core: domain layer for the tonemap override LUT.
//!
//! This crate tracks every parameter that feeds the LUT, detects changes,
//! picks the shader permutation and plans the render pass. No GPU or
//! framework dependencies; backends implement the recorder and target traits.

pub mod aces;
pub mod cache;
pub mod color_space;
pub mod cvars;
pub mod error;
pub mod hook;
pub mod lut;
pub mod permutation;
pub mod renderer;
pub mod settings;
pub mod texture;
pub mod view;

// Re-exports for convenience.
pub use cache::{CachedLutSettings, FrameInputs, LutParameterBlock};
pub use color_space::WorkingColorSpace;
pub use cvars::ConsoleVariables;
pub use error::{Result, TonemapError};
pub use hook::{
    HookPoint, InjectionOutcome, InjectionStrategy, LutStatus, LutTargetProvider, SkipReason,
    TonemapExtension,
};
pub use lut::Lut3D;
pub use permutation::{DispatchPath, PermutationKey};
pub use renderer::{LutCommandRecorder, LutPass};
pub use settings::{Gt7UcsType, TonemapOperator, TonemapSettings};
pub use texture::{LutTextureDesc, OutputTexture, TextureAssets, TextureHandle};
pub use view::ViewState;
