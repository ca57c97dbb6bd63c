//! Forward renderer for the lab bench.
//!
//! Every shown part is drawn with simple Lambert shading plus its emissive
//! color, so the hover highlight shows up as a brightened part. Uses two
//! bind groups:
//! - **Group 0**: camera uniforms (view-projection, camera position)
//! - **Group 1**: per-part uniforms (model matrix, normal matrix, colors)
//!
//! Each part gets its own uniform buffer and bind group, created when the
//! part is first seen by [`LabRenderer::sync`].

use std::collections::HashMap;

use crate::camera::Camera;
use crate::color::Color;
use crate::gpu::GpuContext;
use crate::mesh::{GpuMesh, Transform, Vertex3d};
use crate::scene::{Material, Name, PartGeometry, SceneGraph};

const SHADER: &str = r#"
struct CameraUniforms {
    view_proj: mat4x4<f32>,
    camera_pos: vec3<f32>,
    _pad: f32,
};

struct PartUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    base_color: vec4<f32>,
    emissive: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> part: PartUniforms;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
};

@vertex
fn vs(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    let world = part.model * vec4<f32>(position, 1.0);
    var out: VsOut;
    out.clip = camera.view_proj * world;
    out.normal = (part.normal_matrix * vec4<f32>(normal, 0.0)).xyz;
    return out;
}

const LIGHT_DIR: vec3<f32> = vec3<f32>(0.4, 1.0, 0.6);
const AMBIENT: f32 = 0.3;

@fragment
fn fs(frag: VsOut) -> @location(0) vec4<f32> {
    let n = normalize(frag.normal);
    let diffuse = max(dot(n, normalize(LIGHT_DIR)), 0.0);
    let lit = part.base_color.rgb * (AMBIENT + (1.0 - AMBIENT) * diffuse);
    return vec4<f32>(lit + part.emissive.rgb, part.base_color.a);
}
"#;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 3],
    _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PartUniforms {
    model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix, for non-uniform scaling.
    normal_matrix: [[f32; 4]; 4],
    base_color: [f32; 4],
    emissive: [f32; 4],
}

impl PartUniforms {
    fn new(transform: &Transform, material: &Material) -> Self {
        let model = transform.matrix();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            base_color: material.base.to_array(),
            emissive: material.emissive.to_array(),
        }
    }
}

struct GpuPart {
    mesh: GpuMesh,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct LabRenderer {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    part_layout: wgpu::BindGroupLayout,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    parts: HashMap<hecs::Entity, GpuPart>,
    clear_color: wgpu::Color,
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

impl LabRenderer {
    pub fn new(gpu: &GpuContext, clear_color: Color) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lab Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_layout = uniform_layout(device, "Camera Bind Group Layout");
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let part_layout = uniform_layout(device, "Part Bind Group Layout");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lab Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &part_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Lab Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            part_layout,
            depth_view: Self::create_depth_view(gpu),
            depth_size: (gpu.width(), gpu.height()),
            parts: HashMap::new(),
            clear_color: clear_color.into(),
        }
    }

    fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreates the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Uploads geometry for parts spawned since the last call.
    pub fn sync(&mut self, gpu: &GpuContext, scene: &SceneGraph) {
        let mut query = scene.world().query::<(&PartGeometry, &Name)>();
        for (entity, (geometry, name)) in query.iter() {
            if self.parts.contains_key(&entity) {
                continue;
            }

            let mesh = GpuMesh::new(gpu, &geometry.0, &name.0);
            let uniforms = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{} Uniforms", name.0)),
                size: std::mem::size_of::<PartUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Bind Group", name.0)),
                layout: &self.part_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                }],
            });

            log::debug!("uploaded '{}' ({} indices)", name.0, mesh.index_count);
            self.parts.insert(
                entity,
                GpuPart {
                    mesh,
                    uniforms,
                    bind_group,
                },
            );
        }
    }

    /// Draws every shown part.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        scene: &SceneGraph,
        camera: &Camera,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost, reconfiguring");
                gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring the next frame");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.ensure_depth_size(gpu);

        let camera_uniforms = CameraUniforms {
            view_proj: camera.view_projection(gpu.aspect()).to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            _pad: 0.0,
        };
        gpu.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera_uniforms]));

        let mut draws = Vec::with_capacity(self.parts.len());
        for (&entity, part) in &self.parts {
            if !scene.is_shown(entity) {
                continue;
            }
            let Ok(mut query) = scene.world().query_one::<(&Transform, &Material)>(entity) else {
                continue;
            };
            let Some((transform, material)) = query.get() else {
                continue;
            };
            gpu.queue.write_buffer(
                &part.uniforms,
                0,
                bytemuck::cast_slice(&[PartUniforms::new(transform, material)]),
            );
            draws.push(part);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Lab Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Lab Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            for part in draws {
                render_pass.set_bind_group(1, &part.bind_group, &[]);
                render_pass.set_vertex_buffer(0, part.mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(part.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..part.mesh.index_count, 0, 0..1);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
