//! Ray-marched metaball pass.
//!
//! A fullscreen pass that reconstructs a world-space ray per pixel from the
//! inverse projection and camera-to-world matrices, sphere-traces a smooth
//! union of one sphere per particle, and shades hits with the sky cubemap.
//! Misses show the scene underneath.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::fullscreen_shader;
use super::particle_textures::{read_entry, ParticleTextures};
use crate::camera::CameraMatrices;
use crate::sky::Cubemap;

/// Uniforms for the metaball shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct MetaballParams {
    inv_proj: [[f32; 4]; 4],
    inv_view: [[f32; 4]; 4],
    camera_pos: [f32; 3],
    epsilon: f32,
    side: u32,
    count: u32,
    _pad: [u32; 2],
}

/// The sky cubemap uploaded to the GPU.
pub struct SkyTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl SkyTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, cubemap: &Cubemap) -> Self {
        let size = wgpu::Extent3d {
            width: cubemap.size,
            height: cubemap.size,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Sky Cubemap"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in cubemap.faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                face,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(cubemap.bytes_per_row()),
                    rows_per_image: Some(cubemap.size),
                },
                wgpu::Extent3d {
                    width: cubemap.size,
                    height: cubemap.size,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Sky Cubemap View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        Self { texture, view }
    }
}

/// Pipeline and per-slot bind groups for the metaball pass.
pub struct MetaballPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    /// Indexed by the particle slot being read. Rebuilt when the scene target changes.
    bind_groups: [wgpu::BindGroup; 2],
    side: u32,
    count: u32,
}

impl MetaballPass {
    pub fn new(
        device: &wgpu::Device,
        particles: &ParticleTextures,
        sky: &SkyTexture,
        scene_view: &wgpu::TextureView,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        let grid = particles.grid;
        let params = MetaballParams {
            inv_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            inv_view: glam::Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0, 0.0, 9.0],
            epsilon: 0.001,
            side: grid.side(),
            count: grid.count(),
            _pad: [0; 2],
        };

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Metaball Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Metaball Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Metaball Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Scene color
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                read_entry(3, wgpu::ShaderStages::FRAGMENT),
                read_entry(4, wgpu::ShaderStages::FRAGMENT),
                // Sky
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Metaball Shader"),
            source: wgpu::ShaderSource::Wgsl(fullscreen_shader(METABALL_FRAGMENT).into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Metaball Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Metaball Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let bind_groups = create_bind_groups(
            device,
            &layout,
            &params_buffer,
            &sampler,
            particles,
            sky,
            scene_view,
        );

        Self {
            pipeline,
            layout,
            params_buffer,
            sampler,
            bind_groups,
            side: grid.side(),
            count: grid.count(),
        }
    }

    /// Point the pass at a recreated scene target.
    pub fn rebind_scene(
        &mut self,
        device: &wgpu::Device,
        particles: &ParticleTextures,
        sky: &SkyTexture,
        scene_view: &wgpu::TextureView,
    ) {
        self.bind_groups = create_bind_groups(
            device,
            &self.layout,
            &self.params_buffer,
            &self.sampler,
            particles,
            sky,
            scene_view,
        );
    }

    /// Upload this frame's camera and surface epsilon.
    pub fn write_params(&self, queue: &wgpu::Queue, camera: &CameraMatrices, epsilon: f32) {
        let params = MetaballParams {
            inv_proj: camera.inv_proj.to_cols_array_2d(),
            inv_view: camera.inv_view.to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            epsilon,
            side: self.side,
            count: self.count,
            _pad: [0; 2],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
    }

    /// Ray-march over the scene into `target`, reading particle slot `slot`.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, slot: usize) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Metaball Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_groups[slot], &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_bind_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    params_buffer: &wgpu::Buffer,
    sampler: &wgpu::Sampler,
    particles: &ParticleTextures,
    sky: &SkyTexture,
    scene_view: &wgpu::TextureView,
) -> [wgpu::BindGroup; 2] {
    [0usize, 1].map(|slot| {
        let slot_textures = particles.slots.get(slot);
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Metaball Bind Group (slot {})", slot)),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&slot_textures.pos_and_life_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&slot_textures.vel_and_scale_view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&sky.view),
                },
            ],
        })
    })
}

pub(crate) const METABALL_FRAGMENT: &str = r#"
struct MetaballParams {
    inv_proj: mat4x4<f32>,
    inv_view: mat4x4<f32>,
    camera_pos: vec3<f32>,
    epsilon: f32,
    side: u32,
    count: u32,
    _pad: vec2<u32>,
};

@group(0) @binding(0)
var<uniform> params: MetaballParams;

@group(0) @binding(1)
var u_scene: texture_2d<f32>;

@group(0) @binding(2)
var u_sampler: sampler;

@group(0) @binding(3)
var u_cs_buf_pos_and_life: texture_2d<f32>;

@group(0) @binding(4)
var u_cs_buf_vel_and_scale: texture_2d<f32>;

@group(0) @binding(5)
var u_cubemap: texture_cube<f32>;

const MAX_STEPS: i32 = 96;
const MAX_DIST: f32 = 40.0;
const BLEND_K: f32 = 0.6;

// Polynomial smooth minimum
fn smin(a: f32, b: f32, k: f32) -> f32 {
    let h = clamp(0.5 + 0.5 * (b - a) / k, 0.0, 1.0);
    return mix(b, a, h) - k * h * (1.0 - h);
}

fn field_sdf(p: vec3<f32>) -> f32 {
    var d = MAX_DIST;
    for (var i = 0u; i < params.count; i = i + 1u) {
        let coord = vec2<i32>(i32(i % params.side), i32(i / params.side));
        let pos_life = textureLoad(u_cs_buf_pos_and_life, coord, 0);
        let vel_scale = textureLoad(u_cs_buf_vel_and_scale, coord, 0);
        let radius = vel_scale.w * clamp(pos_life.w * 4.0, 0.0, 1.0);
        d = smin(d, length(p - pos_life.xyz) - radius, BLEND_K);
    }
    return d;
}

fn estimate_normal(p: vec3<f32>) -> vec3<f32> {
    let e = vec2<f32>(params.epsilon, 0.0);
    return normalize(vec3<f32>(
        field_sdf(p + e.xyy) - field_sdf(p - e.xyy),
        field_sdf(p + e.yxy) - field_sdf(p - e.yxy),
        field_sdf(p + e.yyx) - field_sdf(p - e.yyx),
    ));
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let src = textureSampleLevel(u_scene, u_sampler, in.uv, 0.0);

    // Reconstruct the world-space ray through this pixel
    let ndc = vec4<f32>(in.uv.x * 2.0 - 1.0, (1.0 - in.uv.y) * 2.0 - 1.0, 1.0, 1.0);
    let view_h = params.inv_proj * ndc;
    let view_dir = normalize(view_h.xyz / view_h.w);
    let dir = normalize((params.inv_view * vec4<f32>(view_dir, 0.0)).xyz);
    let origin = params.camera_pos;

    var t = 0.0;
    var hit = false;
    for (var i = 0; i < MAX_STEPS; i = i + 1) {
        let d = field_sdf(origin + dir * t);
        if (d < params.epsilon) {
            hit = true;
            break;
        }
        t = t + d;
        if (t > MAX_DIST) {
            break;
        }
    }

    if (!hit) {
        return src;
    }

    let p = origin + dir * t;
    let n = estimate_normal(p);
    let env = textureSampleLevel(u_cubemap, u_sampler, reflect(dir, n), 0.0).rgb;

    let light = normalize(vec3<f32>(0.4, 1.0, 0.3));
    let diffuse = max(dot(n, light), 0.0);
    let fresnel = pow(1.0 - max(dot(-dir, n), 0.0), 3.0);
    let base = vec3<f32>(0.05, 0.08, 0.12);
    let color = base * (0.3 + diffuse) + env * mix(0.25, 1.0, fresnel);

    return vec4<f32>(mix(src.rgb, color, 0.9), 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_size() {
        // Two mat4 + vec3/f32 + two scalars + padding
        assert_eq!(std::mem::size_of::<MetaballParams>(), 160);
    }

    #[test]
    fn test_metaball_shader_valid() {
        super::super::validate_wgsl(&fullscreen_shader(METABALL_FRAGMENT)).unwrap();
    }
}
