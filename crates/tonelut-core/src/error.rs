//! Error types shared by the configuration and asset layers.

use std::io;

/// Errors raised while loading settings, console variables or LUT assets.
///
/// Per-frame rendering never returns these; see [`crate::hook::SkipReason`].
#[derive(Debug, thiserror::Error)]
pub enum TonemapError {
    #[error("failed to parse tonemap settings: {0}")]
    Settings(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown console variable: {0}")]
    UnknownVariable(String),
    #[error("invalid value {value:?} for console variable {name}")]
    InvalidValue { name: &'static str, value: String },
    #[error("invalid LUT size {0}, expected 2..=256")]
    InvalidLutSize(u32),
    #[error("malformed .cube data at line {line}: {reason}")]
    MalformedCube { line: usize, reason: String },
}

pub type Result<T, E = TonemapError> = std::result::Result<T, E>;
