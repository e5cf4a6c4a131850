//! wgpu recording of tonemap LUT passes.
//!
//! [`LutRenderer`] owns the shader module, bind group layouts and one pipeline
//! per (permutation, dispatch path) pair, compiled on first use.
//! [`LutFrameRecorder`] borrows it together with a command encoder and
//! implements the core's [`LutCommandRecorder`].

use std::collections::HashMap;
use std::num::NonZeroU64;

use tonelut_core::permutation::PermutationKey;
use tonelut_core::renderer::{LutCommandRecorder, LutPass};
use tonelut_core::texture::TextureHandle;
use wgpu::util::DeviceExt;

use crate::GpuError;
use crate::params::LutParamsGpu;
use crate::textures::{LUT_FORMAT, TextureRegistry};

/// Pipelines and layouts for `tonemap_lut.wgsl`.
pub struct LutRenderer {
    shader: wgpu::ShaderModule,
    params_layout: wgpu::BindGroupLayout,
    flat_output_layout: wgpu::BindGroupLayout,
    volume_output_layout: wgpu::BindGroupLayout,
    compute_pipelines: HashMap<(PermutationKey, bool), wgpu::ComputePipeline>,
    raster_pipelines: HashMap<(PermutationKey, bool), wgpu::RenderPipeline>,
}

impl LutRenderer {
    /// Compile the shader module and create layouts. Pipelines are built lazily.
    pub fn new(device: &wgpu::Device, float32_filterable: bool) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tonelut_lut_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/tonemap_lut.wgsl").into()),
        });

        let stages = wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::FRAGMENT;
        let sampler_type = if float32_filterable {
            wgpu::SamplerBindingType::Filtering
        } else {
            wgpu::SamplerBindingType::NonFiltering
        };

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tonelut_lut_params_layout"),
            entries: &[
                // binding 0: LUT parameters
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: stages,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<LutParamsGpu>() as u64
                        ),
                    },
                    count: None,
                },
                // binding 1: operator LUT asset (black fallback when unbound)
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: stages,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float {
                            filterable: float32_filterable,
                        },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                // binding 2: LUT asset sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: stages,
                    ty: wgpu::BindingType::Sampler(sampler_type),
                    count: None,
                },
            ],
        });

        let flat_output_layout = storage_output_layout(
            device,
            "tonelut_lut_flat_output_layout",
            0,
            wgpu::TextureViewDimension::D2,
        );
        let volume_output_layout = storage_output_layout(
            device,
            "tonelut_lut_volume_output_layout",
            1,
            wgpu::TextureViewDimension::D3,
        );

        Self {
            shader,
            params_layout,
            flat_output_layout,
            volume_output_layout,
            compute_pipelines: HashMap::new(),
            raster_pipelines: HashMap::new(),
        }
    }

    /// Number of pipelines compiled so far.
    pub fn pipeline_count(&self) -> usize {
        self.compute_pipelines.len() + self.raster_pipelines.len()
    }

    fn compute_pipeline(
        &mut self,
        device: &wgpu::Device,
        permutation: PermutationKey,
        volume: bool,
    ) -> &wgpu::ComputePipeline {
        let key = (permutation, volume);
        if !self.compute_pipelines.contains_key(&key) {
            tracing::debug!(%permutation, volume, "Compiling tonemap LUT compute pipeline");
            let pipeline = self.create_compute_pipeline(device, permutation, volume);
            self.compute_pipelines.insert(key, pipeline);
        }
        &self.compute_pipelines[&key]
    }

    fn raster_pipeline(
        &mut self,
        device: &wgpu::Device,
        permutation: PermutationKey,
        volume: bool,
    ) -> &wgpu::RenderPipeline {
        let key = (permutation, volume);
        if !self.raster_pipelines.contains_key(&key) {
            tracing::debug!(%permutation, volume, "Compiling tonemap LUT raster pipeline");
            let pipeline = self.create_render_pipeline(device, permutation, volume);
            self.raster_pipelines.insert(key, pipeline);
        }
        &self.raster_pipelines[&key]
    }

    fn create_compute_pipeline(
        &self,
        device: &wgpu::Device,
        permutation: PermutationKey,
        volume: bool,
    ) -> wgpu::ComputePipeline {
        let output_layout = if volume {
            &self.volume_output_layout
        } else {
            &self.flat_output_layout
        };
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tonelut_lut_compute_pipeline_layout"),
            bind_group_layouts: &[&self.params_layout, output_layout],
            push_constant_ranges: &[],
        });

        let constants = permutation_constants(permutation);
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("tonelut_lut_compute_pipeline"),
            layout: Some(&layout),
            module: &self.shader,
            entry_point: Some(if volume {
                "create_lut_volume_cs"
            } else {
                "create_lut_cs"
            }),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &constants,
                ..Default::default()
            },
            cache: None,
        })
    }

    fn create_render_pipeline(
        &self,
        device: &wgpu::Device,
        permutation: PermutationKey,
        volume: bool,
    ) -> wgpu::RenderPipeline {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tonelut_lut_raster_pipeline_layout"),
            bind_group_layouts: &[&self.params_layout],
            push_constant_ranges: &[],
        });

        let [operator, srgb, skip_temperature, ucs] = permutation_constants(permutation);
        let fragment_constants = [
            operator,
            srgb,
            skip_temperature,
            ucs,
            ("USE_VOLUME_LUT", flag(volume)),
        ];

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tonelut_lut_raster_pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_fullscreen"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("create_lut_fs"),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &fragment_constants,
                    ..Default::default()
                },
                targets: &[Some(wgpu::ColorTargetState {
                    format: LUT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn params_bind_group(
        &self,
        registry: &TextureRegistry,
        pass: &LutPass<'_>,
    ) -> Result<wgpu::BindGroup, GpuError> {
        let device = registry.device();
        let gpu_params = LutParamsGpu::from_pass(pass);
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tonelut_lut_params_uniform"),
            contents: bytemuck::bytes_of(&gpu_params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let requested = pass.parameters.custom.lut_texture.texture;
        let lut_texture = match registry.get(requested) {
            Some(texture) => texture,
            None => {
                tracing::warn!(handle = ?requested, "LUT asset released, binding black");
                registry.require(TextureHandle::BLACK)?
            }
        };

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tonelut_lut_params_bind_group"),
            layout: &self.params_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&lut_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(registry.lut_sampler()),
                },
            ],
        }))
    }

    fn output_bind_group(
        &self,
        device: &wgpu::Device,
        volume: bool,
        view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        let (layout, binding) = if volume {
            (&self.volume_output_layout, 1)
        } else {
            (&self.flat_output_layout, 0)
        };
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tonelut_lut_output_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(view),
            }],
        })
    }
}

/// Records LUT passes for one frame into a caller-owned encoder.
///
/// The core's recorder interface is infallible, so failures are logged and the
/// first one is held until [`finish`](Self::finish).
pub struct LutFrameRecorder<'a> {
    renderer: &'a mut LutRenderer,
    registry: &'a TextureRegistry,
    encoder: &'a mut wgpu::CommandEncoder,
    passes: usize,
    error: Option<GpuError>,
}

impl<'a> LutFrameRecorder<'a> {
    pub fn new(
        renderer: &'a mut LutRenderer,
        registry: &'a TextureRegistry,
        encoder: &'a mut wgpu::CommandEncoder,
    ) -> Self {
        Self {
            renderer,
            registry,
            encoder,
            passes: 0,
            error: None,
        }
    }

    /// Passes recorded, or the first recording error.
    pub fn finish(self) -> Result<usize, GpuError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.passes),
        }
    }

    fn fail(&mut self, e: GpuError) {
        tracing::error!("Tonemap LUT pass not recorded: {e}");
        self.error.get_or_insert(e);
    }

    fn record_compute(&mut self, pass: &LutPass<'_>, groups: [u32; 3]) -> Result<(), GpuError> {
        let registry = self.registry;
        let device = registry.device();
        let output = registry.require(pass.output.handle)?;
        let params = self.renderer.params_bind_group(registry, pass)?;
        let target = self.renderer.output_bind_group(device, pass.path.volume, &output.view);
        let pipeline = self
            .renderer
            .compute_pipeline(device, pass.permutation, pass.path.volume);

        let mut cpass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("tonelut_lut_compute_pass"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(pipeline);
        cpass.set_bind_group(0, &params, &[]);
        cpass.set_bind_group(1, &target, &[]);
        cpass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        Ok(())
    }

    /// `slices` of `None` draws the flattened atlas in one pass.
    fn record_raster(&mut self, pass: &LutPass<'_>, slices: Option<u32>) -> Result<(), GpuError> {
        let registry = self.registry;
        let device = registry.device();
        let output = registry.require(pass.output.handle)?;
        let params = self.renderer.params_bind_group(registry, pass)?;
        let pipeline = self
            .renderer
            .raster_pipeline(device, pass.permutation, pass.path.volume);

        // Flat atlases are one pass; volumes get one pass per depth slice.
        let slices = slices.map_or(vec![None], |n| (0..n).map(Some).collect());
        for depth_slice in slices {
            let mut rpass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tonelut_lut_raster_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &output.view,
                    depth_slice,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &params, &[]);
            let instance = depth_slice.unwrap_or(0);
            rpass.draw(0..3, instance..instance + 1);
        }
        Ok(())
    }
}

impl LutCommandRecorder for LutFrameRecorder<'_> {
    fn dispatch_compute(&mut self, pass: &LutPass<'_>, groups: [u32; 3]) {
        match self.record_compute(pass, groups) {
            Ok(()) => self.passes += 1,
            Err(e) => self.fail(e),
        }
    }

    fn draw_volume_slices(&mut self, pass: &LutPass<'_>, slices: u32) {
        match self.record_raster(pass, Some(slices)) {
            Ok(()) => self.passes += 1,
            Err(e) => self.fail(e),
        }
    }

    fn draw_fullscreen(&mut self, pass: &LutPass<'_>) {
        match self.record_raster(pass, None) {
            Ok(()) => self.passes += 1,
            Err(e) => self.fail(e),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn storage_output_layout(
    device: &wgpu::Device,
    label: &str,
    binding: u32,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: LUT_FORMAT,
                view_dimension,
            },
            count: None,
        }],
    })
}

const fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Override constants shared by every entry point.
fn permutation_constants(key: PermutationKey) -> [(&'static str, f64); 4] {
    [
        ("TONEMAP_OPERATOR", f64::from(key.operator.to_u32())),
        ("OUTPUT_DEVICE_SRGB", flag(key.output_device_srgb)),
        ("SKIP_TEMPERATURE", flag(key.skip_temperature)),
        ("UCS_TYPE", f64::from(key.ucs_type.to_u32())),
    ]
}
