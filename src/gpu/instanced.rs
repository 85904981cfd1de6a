//! Instanced debug mesh.
//!
//! One indexed draw renders the mesh once per particle. The draw arguments
//! live in a GPU indirect buffer (`index_count, instance_count, 0, 0, 0`),
//! and the vertex shader places each instance by loading its texel from
//! the particle textures.

use bytemuck::{Pod, Zeroable};
use wgpu::util::{DeviceExt, DrawIndexedIndirectArgs};

use super::particle_textures::{read_entry, ParticleTextures};
use super::DEPTH_FORMAT;
use crate::camera::CameraMatrices;
use crate::mesh::{MeshData, Vertex};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct MeshUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 3],
    side: u32,
}

/// Indirect draw arguments for `index_count` indices per instance.
pub(crate) fn indirect_args(index_count: u32, instance_count: u32) -> DrawIndexedIndirectArgs {
    DrawIndexedIndirectArgs {
        index_count,
        instance_count,
        first_index: 0,
        base_vertex: 0,
        first_instance: 0,
    }
}

/// GPU state for drawing the debug mesh.
pub struct DebugMeshRenderer {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    args_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    /// Indexed by the slot being read.
    bind_groups: [wgpu::BindGroup; 2],
    side: u32,
}

impl DebugMeshRenderer {
    pub fn new(
        device: &wgpu::Device,
        mesh: &MeshData,
        particles: &ParticleTextures,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        // Empty meshes still bind a one-element buffer; the draw has zero indices.
        let (vertices, indices) = if mesh.is_empty() {
            (vec![Vertex::zeroed()], vec![0u32])
        } else {
            (mesh.vertices.clone(), mesh.indices.clone())
        };

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let args = indirect_args(mesh.index_count(), particles.grid.count());
        let args_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Mesh Indirect Args"),
            contents: args.as_bytes(),
            usage: wgpu::BufferUsages::INDIRECT,
        });

        let uniforms = MeshUniforms {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0; 3],
            side: particles.grid.side(),
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Mesh Uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Debug Mesh Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                read_entry(1, wgpu::ShaderStages::VERTEX),
                read_entry(2, wgpu::ShaderStages::VERTEX),
            ],
        });

        let bind_groups = [0usize, 1].map(|slot| {
            let slot_textures = particles.slots.get(slot);
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Debug Mesh Bind Group (slot {})", slot)),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(
                            &slot_textures.pos_and_life_view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(
                            &slot_textures.vel_and_scale_view,
                        ),
                    },
                ],
            })
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Debug Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(DEBUG_MESH_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Debug Mesh Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Debug Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!(
            "Debug mesh: {} indices x {} instances",
            mesh.index_count(),
            particles.grid.count()
        );

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            args_buffer,
            uniform_buffer,
            bind_groups,
            side: particles.grid.side(),
        }
    }

    /// Upload this frame's camera.
    pub fn write_uniforms(&self, queue: &wgpu::Queue, camera: &CameraMatrices) {
        let uniforms = MeshUniforms {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            side: self.side,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Issue the indirect draw reading particle slot `slot`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, slot: usize) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_groups[slot], &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed_indirect(&self.args_buffer, 0);
    }
}

pub(crate) const DEBUG_MESH_SHADER: &str = r#"
struct MeshUniforms {
    view_proj: mat4x4<f32>,
    camera_pos: vec3<f32>,
    side: u32,
};

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) world_pos: vec3<f32>,
    @location(2) speed: f32,
};

@group(0) @binding(0)
var<uniform> uniforms: MeshUniforms;

@group(0) @binding(1)
var u_cs_buf_pos_and_life: texture_2d<f32>;

@group(0) @binding(2)
var u_cs_buf_vel_and_scale: texture_2d<f32>;

@vertex
fn vs_main(v: VertexInput, @builtin(instance_index) instance: u32) -> VertexOutput {
    let coord = vec2<i32>(i32(instance % uniforms.side), i32(instance / uniforms.side));
    let pos_life = textureLoad(u_cs_buf_pos_and_life, coord, 0);
    let vel_scale = textureLoad(u_cs_buf_vel_and_scale, coord, 0);

    // Shrink instances as they run out of life
    let size = vel_scale.w * 0.35 * clamp(pos_life.w * 4.0, 0.0, 1.0);
    let world = pos_life.xyz + v.position * size;

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(world, 1.0);
    out.normal = v.normal;
    out.world_pos = world;
    out.speed = length(vel_scale.xyz);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let light = normalize(vec3<f32>(0.4, 1.0, 0.3));
    let view_dir = normalize(uniforms.camera_pos - in.world_pos);
    let diffuse = max(dot(n, light), 0.0) * 0.7 + 0.3;
    let rim = pow(1.0 - max(dot(n, view_dir), 0.0), 2.0) * 0.3;

    let cold = vec3<f32>(0.2, 0.5, 1.0);
    let hot = vec3<f32>(1.0, 0.45, 0.15);
    let color = mix(cold, hot, clamp(in.speed * 0.5, 0.0, 1.0));
    return vec4<f32>(color * diffuse + vec3<f32>(rim), 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indirect_args_words() {
        let args = indirect_args(240, 64);
        let words: &[u32] = bytemuck::cast_slice(args.as_bytes());
        assert_eq!(words, &[240, 64, 0, 0, 0]);
    }

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<MeshUniforms>(), 80);
    }

    #[test]
    fn test_debug_mesh_shader_valid() {
        super::super::validate_wgsl(DEBUG_MESH_SHADER).unwrap();
    }
}
