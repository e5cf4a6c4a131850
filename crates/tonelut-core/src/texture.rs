//! Opaque texture and sampler identities shared between the core and a GPU backend.
//!
//! The core never owns texture memory. It compares handles by identity and
//! tells the backend which handle to write into.

use std::collections::HashMap;

/// Identity of a GPU texture owned by the host or the asset system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

impl TextureHandle {
    /// 1×1×1 black texture bound when no LUT asset is available.
    pub const BLACK: Self = Self(0);
}

/// Identity of a sampler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerHandle {
    BilinearClamp,
}

/// Texture + sampler bound as the operator's external LUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LutTextureBinding {
    pub texture: TextureHandle,
    pub sampler: SamplerHandle,
}

impl Default for LutTextureBinding {
    fn default() -> Self {
        Self {
            texture: TextureHandle::BLACK,
            sampler: SamplerHandle::BilinearClamp,
        }
    }
}

/// Resolves LUT asset paths to loaded textures.
///
/// Returning `None` means the asset is unknown or not resident.
pub trait TextureAssets {
    fn resolve(&self, path: &str) -> Option<TextureHandle>;
}

/// No assets at all; every lookup falls back to black.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssets;

impl TextureAssets for NoAssets {
    fn resolve(&self, _path: &str) -> Option<TextureHandle> {
        None
    }
}

impl TextureAssets for HashMap<String, TextureHandle> {
    fn resolve(&self, path: &str) -> Option<TextureHandle> {
        self.get(path).copied()
    }
}

/// Shape and usage of a LUT render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LutTextureDesc {
    /// `[width, height, depth]`.
    pub extent: [u32; 3],
    /// Writable from compute (storage binding / UAV).
    pub storage_binding: bool,
}

impl LutTextureDesc {
    /// `(size, size, size)` for volume layouts, `(size*size, size, 1)` otherwise.
    pub const fn for_lut(size: u32, volume: bool, storage_binding: bool) -> Self {
        let extent = if volume {
            [size, size, size]
        } else {
            [size * size, size, 1]
        };
        Self {
            extent,
            storage_binding,
        }
    }

    /// LUT resolution per color axis.
    pub const fn lut_size(&self) -> u32 {
        self.extent[1]
    }

    /// Volume layouts are square in x/y.
    pub const fn is_volume(&self) -> bool {
        self.extent[0] == self.extent[1]
    }
}

/// A LUT render target handed over by the host for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputTexture {
    pub handle: TextureHandle,
    pub desc: LutTextureDesc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattened_desc_is_atlas_of_tiles() {
        let desc = LutTextureDesc::for_lut(32, false, true);
        assert_eq!(desc.extent, [1024, 32, 1]);
        assert_eq!(desc.lut_size(), 32);
        assert!(!desc.is_volume());
    }

    #[test]
    fn test_volume_desc_is_cube() {
        let desc = LutTextureDesc::for_lut(16, true, false);
        assert_eq!(desc.extent, [16, 16, 16]);
        assert!(desc.is_volume());
    }
}
