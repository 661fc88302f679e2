use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::camera::CameraFrameParameters;
use crate::trace::{BufferFormat, DispatchExtent, GROUP_EDGE};

use super::EnvironmentImage;

const RESULT_FORMAT_TOKEN: &str = "RESULT_FORMAT";

/// Uniform block matching `Camera` in `trace.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct CameraUniform {
    camera_to_world: [[f32; 4]; 4],
    inverse_projection: [[f32; 4]; 4],
}

impl<E> From<&CameraFrameParameters<E>> for CameraUniform {
    fn from(params: &CameraFrameParameters<E>) -> Self {
        Self {
            camera_to_world: params.camera_to_world.to_cols_array_2d(),
            inverse_projection: params.inverse_projection.to_cols_array_2d(),
        }
    }
}

/// Compute pipeline of the view-ray kernel.
///
/// The storage format is baked into the shader, so the pipeline is rebuilt
/// when the off-screen buffer format changes.
#[derive(Default)]
pub(super) struct KernelPipeline {
    built: Option<KernelState>,
}

struct KernelState {
    format: BufferFormat,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl KernelPipeline {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Records one dispatch writing into `output`.
    ///
    /// Every dispatch binds its own camera uniform buffer, so several
    /// dispatches recorded before one submit each see their own camera.
    pub(super) fn record(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        format: BufferFormat,
        params: &CameraFrameParameters<EnvironmentImage>,
        groups: DispatchExtent,
    ) {
        let state = self.ensure_pipeline(device, format);

        let camera_ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("nergal kernel camera ubo"),
            contents: bytemuck::bytes_of(&CameraUniform::from(params)),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let environment = &params.environment;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nergal kernel bind group"),
            layout: &state.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(output),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: camera_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(environment.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(environment.sampler()),
                },
            ],
        });

        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("nergal kernel pass"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&state.pipeline);
        cpass.set_bind_group(0, &bind_group, &[]);
        cpass.dispatch_workgroups(groups.groups_x, groups.groups_y, groups.groups_z());
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, format: BufferFormat) -> &KernelState {
        let state = match self.built.take() {
            Some(state) if state.format == format => state,
            _ => KernelState::build(device, format),
        };
        self.built.insert(state)
    }
}

impl KernelState {
    fn build(device: &wgpu::Device, format: BufferFormat) -> Self {
        let shader_src = include_str!("../shaders/trace.wgsl").replace(RESULT_FORMAT_TOKEN, format.wgsl_name());
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nergal kernel shader"),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nergal kernel bgl"),
            entries: &[
                // Result
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: format.to_wgpu(),
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // CameraToWorld + CameraInverseProjection
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(std::mem::size_of::<CameraUniform>() as u64),
                    },
                    count: None,
                },
                // EnvironmentImage
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nergal kernel pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("nergal kernel pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &[("GROUP_EDGE", f64::from(GROUP_EDGE))],
                zero_initialize_workgroup_memory: false,
            },
            cache: None,
        });

        log::debug!("built kernel pipeline for {}", format.wgsl_name());

        Self {
            format,
            pipeline,
            bind_group_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_uniform_is_two_column_major_matrices() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 128);
    }

    #[test]
    fn shader_declares_the_format_token_and_group_edge() {
        let src = include_str!("../shaders/trace.wgsl");
        assert!(src.contains(RESULT_FORMAT_TOKEN));
        assert!(src.contains("override GROUP_EDGE"));
        assert!(src.contains("@workgroup_size(GROUP_EDGE, GROUP_EDGE, 1)"));
    }

    #[test]
    fn uniform_keeps_matrix_columns() {
        let params = CameraFrameParameters {
            camera_to_world: glam::Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0)),
            inverse_projection: glam::Mat4::IDENTITY,
            environment: std::sync::Arc::new(()),
        };
        let u = CameraUniform::from(&params);
        assert_eq!(u.camera_to_world[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.inverse_projection[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
