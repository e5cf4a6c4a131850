//! Texture ownership for LUT targets and LUT assets.
//!
//! The core only sees [`TextureHandle`]s. The registry maps them to wgpu
//! textures, keeps the black fallback alive under [`TextureHandle::BLACK`],
//! and resolves asset paths for the Tony McMapface operator.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tonelut_core::hook::LutTargetProvider;
use tonelut_core::lut::Lut3D;
use tonelut_core::texture::{LutTextureDesc, OutputTexture, TextureAssets, TextureHandle};
use tonelut_core::view::ViewState;

use crate::GpuError;

/// Format of generated LUTs and uploaded LUT assets.
pub const LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

const TEXEL_BYTES: u32 = 16;

/// A texture known to the registry.
pub struct RegisteredTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub extent: [u32; 3],
    pub dimension: wgpu::TextureDimension,
}

/// Handle → texture map shared between the renderer and the host.
pub struct TextureRegistry {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    textures: RwLock<HashMap<TextureHandle, Arc<RegisteredTexture>>>,
    assets: RwLock<HashMap<String, TextureHandle>>,
    next_id: AtomicU64,
    float32_filterable: bool,
    lut_sampler: wgpu::Sampler,
}

impl TextureRegistry {
    /// Create the registry and its 1×1×1 black fallback.
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, float32_filterable: bool) -> Self {
        let filter = if float32_filterable {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        let lut_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tonelut_lut_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let registry = Self {
            device,
            queue,
            textures: RwLock::new(HashMap::new()),
            assets: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(TextureHandle::BLACK.0 + 1),
            float32_filterable,
            lut_sampler,
        };

        let black = registry.upload_volume("tonelut_black_lut", 1, &[[0.0, 0.0, 0.0, 1.0]]);
        registry.textures.write().insert(TextureHandle::BLACK, Arc::new(black));
        registry
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn float32_filterable(&self) -> bool {
        self.float32_filterable
    }

    /// Bilinear clamp when the format allows filtering, nearest otherwise.
    pub fn lut_sampler(&self) -> &wgpu::Sampler {
        &self.lut_sampler
    }

    pub fn get(&self, handle: TextureHandle) -> Option<Arc<RegisteredTexture>> {
        self.textures.read().get(&handle).cloned()
    }

    /// Look up a texture, failing with [`GpuError::UnknownTexture`].
    pub fn require(&self, handle: TextureHandle) -> Result<Arc<RegisteredTexture>, GpuError> {
        self.get(handle).ok_or(GpuError::UnknownTexture(handle))
    }

    /// Drop a texture. The black fallback cannot be removed.
    pub fn remove(&self, handle: TextureHandle) {
        if handle != TextureHandle::BLACK {
            self.textures.write().remove(&handle);
        }
    }

    /// Allocate a LUT render target shaped by `desc`.
    pub fn create_lut_target(&self, desc: &LutTextureDesc) -> Result<OutputTexture, GpuError> {
        let limits = self.device.limits();
        let [width, height, depth] = desc.extent;
        let (dimension, limit) = if desc.is_volume() {
            (wgpu::TextureDimension::D3, limits.max_texture_dimension_3d)
        } else {
            (wgpu::TextureDimension::D2, limits.max_texture_dimension_2d)
        };
        if width > limit || height > limit || depth > limit {
            return Err(GpuError::TextureTooLarge {
                extent: desc.extent,
                limit,
            });
        }

        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC;
        if desc.storage_binding {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tonelut_combined_lut"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: depth,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension,
            format: LUT_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let handle = self.insert(RegisteredTexture {
            texture,
            view,
            extent: desc.extent,
            dimension,
        });
        Ok(OutputTexture { handle, desc: *desc })
    }

    /// Upload a LUT and make it resolvable under `key`. Replaces a previous upload.
    pub fn register_lut_asset(&self, key: &str, lut: &Lut3D) -> Result<TextureHandle, GpuError> {
        let limit = self.device.limits().max_texture_dimension_3d;
        if lut.size > limit {
            return Err(GpuError::TextureTooLarge {
                extent: [lut.size; 3],
                limit,
            });
        }

        let registered = self.upload_volume("tonelut_lut_asset", lut.size, &lut.to_rgba());
        let handle = self.insert(registered);
        if let Some(previous) = self.assets.write().insert(key.to_string(), handle) {
            self.remove(previous);
        }
        tracing::info!(key, size = lut.size, ?handle, "LUT asset registered");
        Ok(handle)
    }

    /// Parse a `.cube` file and register it under `key`.
    pub fn load_cube_asset(&self, key: &str, path: &Path) -> Result<TextureHandle, GpuError> {
        let lut = Lut3D::load_cube(path)?;
        self.register_lut_asset(key, &lut)
    }

    /// Copy a texture back to the CPU as RGBA texels, x fastest. Blocks.
    pub fn read_texels(&self, handle: TextureHandle) -> Result<Vec<[f32; 4]>, GpuError> {
        let registered = self.require(handle)?;
        let [width, height, depth] = registered.extent;
        let row_bytes = width * TEXEL_BYTES;
        let padded_row = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let size = u64::from(padded_row) * u64::from(height) * u64::from(depth);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tonelut_lut_staging"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tonelut_lut_download_encoder"),
            });
        encoder.copy_texture_to_buffer(
            registered.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            registered.texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        staging.slice(..).map_async(wgpu::MapMode::Read, |_| {});
        self.device.poll(wgpu::PollType::wait_indefinitely())?;

        let data = staging.slice(..).get_mapped_range();
        let mut texels = Vec::with_capacity((width * height * depth) as usize);
        for row in data.chunks_exact(padded_row as usize) {
            texels.extend_from_slice(bytemuck::cast_slice::<u8, [f32; 4]>(
                &row[..row_bytes as usize],
            ));
        }
        drop(data);
        staging.unmap();
        Ok(texels)
    }

    fn insert(&self, texture: RegisteredTexture) -> TextureHandle {
        let handle = TextureHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.textures.write().insert(handle, Arc::new(texture));
        handle
    }

    fn upload_volume(&self, label: &str, size: u32, texels: &[[f32; 4]]) -> RegisteredTexture {
        let extent = wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: size,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: LUT_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size * TEXEL_BYTES),
                rows_per_image: Some(size),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        RegisteredTexture {
            texture,
            view,
            extent: [size; 3],
            dimension: wgpu::TextureDimension::D3,
        }
    }
}

impl TextureAssets for TextureRegistry {
    fn resolve(&self, path: &str) -> Option<TextureHandle> {
        self.assets.read().get(path).copied()
    }
}

/// Persistent per-view LUT slots, keyed by the view's state key.
pub struct LutTargetPool {
    registry: Arc<TextureRegistry>,
    slots: HashMap<u32, OutputTexture>,
}

impl LutTargetPool {
    pub fn new(registry: Arc<TextureRegistry>) -> Self {
        Self {
            registry,
            slots: HashMap::new(),
        }
    }

    /// The slot currently held for `view_key`, if any.
    pub fn slot(&self, view_key: u32) -> Option<OutputTexture> {
        self.slots.get(&view_key).copied()
    }

    /// Release every slot.
    pub fn clear(&mut self) {
        for (_, slot) in self.slots.drain() {
            self.registry.remove(slot.handle);
        }
    }
}

impl LutTargetProvider for LutTargetPool {
    fn register_persistent_lut(
        &mut self,
        view: &ViewState,
        desc: &LutTextureDesc,
    ) -> Option<OutputTexture> {
        let key = view.view_key?;
        if let Some(slot) = self.slots.get(&key)
            && slot.desc == *desc
        {
            return Some(*slot);
        }

        match self.registry.create_lut_target(desc) {
            Ok(target) => {
                if let Some(old) = self.slots.insert(key, target) {
                    self.registry.remove(old.handle);
                }
                tracing::debug!(view_key = key, extent = ?desc.extent, "Allocated persistent LUT");
                Some(target)
            }
            Err(e) => {
                tracing::warn!(view_key = key, "Persistent LUT allocation failed: {e}");
                None
            }
        }
    }
}
