//! Device creation and capability probing.

use std::sync::Arc;

use tonelut_core::view::{FeatureLevel, GraphicsBackend, ShaderPlatform};

use crate::GpuError;

/// Features requested when the adapter offers them. None are mandatory.
pub fn required_features() -> wgpu::Features {
    wgpu::Features::FLOAT32_FILTERABLE
}

/// A wgpu device plus the capability snapshot the LUT pipeline keys on.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_info: wgpu::AdapterInfo,
    pub platform: ShaderPlatform,
    /// `Rgba32Float` can be sampled with a filtering sampler.
    pub float32_filterable: bool,
}

impl GpuContext {
    /// Request an adapter and device, blocking on the futures.
    pub fn create_blocking() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        }))
        .map_err(|_| GpuError::NoAdapter)?;

        let features = required_features() & adapter.features();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tonelut_device"),
            required_features: features,
            required_limits: adapter.limits(),
            ..Default::default()
        }))?;

        let adapter_info = adapter.get_info();
        let platform = probe_platform(&adapter_info, &adapter.get_downlevel_capabilities());
        tracing::info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            ?platform,
            "Tonemap LUT device created"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            platform,
            float32_filterable: features.contains(wgpu::Features::FLOAT32_FILTERABLE),
        })
    }
}

/// Map adapter capabilities onto the platform flags the selector understands.
///
/// wgpu has no geometry shaders and no vertex-selected layers; volume LUTs are
/// rasterized with one pass per slice instead, which every non-GL backend can do.
pub fn probe_platform(
    info: &wgpu::AdapterInfo,
    downlevel: &wgpu::DownlevelCapabilities,
) -> ShaderPlatform {
    let backend = match info.backend {
        wgpu::Backend::Vulkan => GraphicsBackend::Vulkan,
        wgpu::Backend::Metal => GraphicsBackend::Metal,
        wgpu::Backend::Dx12 => GraphicsBackend::Dx12,
        wgpu::Backend::Gl => GraphicsBackend::Gl,
        wgpu::Backend::BrowserWebGpu => GraphicsBackend::BrowserWebGpu,
        _ => GraphicsBackend::Other,
    };
    let feature_level = if downlevel.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
        FeatureLevel::Sm5
    } else {
        FeatureLevel::Es31
    };
    let slice_rendering = backend != GraphicsBackend::Gl;

    ShaderPlatform {
        backend,
        feature_level,
        volume_texture_rendering: slice_rendering,
        geometry_shaders: false,
        vertex_shader_layer: slice_rendering,
    }
}
