//! Particle kernels.
//!
//! Two entry points share one bind group layout:
//! - `cs_init_buffers` seeds a slot with random particles
//! - `cs_update_buffers` steps the previous slot into the current one
//!
//! Bind group `i` reads slot `i ^ 1` and writes slot `i`. Which slot each
//! kernel writes comes from [`crate::frame::FrameSchedule`].

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::particle_textures::{read_entry, write_entry, ParticleTextures};
use crate::config::SceneConfig;

/// Uniforms shared by both kernels.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub(crate) struct ComputeParams {
    pub stay_in_cube_range: [f32; 3],
    pub time_delta: f32,
    pub time: f32,
    pub seed: u32,
    pub side: u32,
    pub _pad: u32,
}

/// Pipelines and bind groups for the particle kernels.
pub struct ParticleCompute {
    init_pipeline: wgpu::ComputePipeline,
    update_pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    /// Indexed by the slot being written.
    bind_groups: [wgpu::BindGroup; 2],
    side: u32,
    workgroups: u32,
    seed: u32,
}

impl ParticleCompute {
    pub fn new(device: &wgpu::Device, particles: &ParticleTextures, seed: u32) -> Self {
        let grid = particles.grid;
        let params = ComputeParams {
            stay_in_cube_range: [3.0; 3],
            time_delta: 0.0,
            time: 0.0,
            seed,
            side: grid.side(),
            _pad: 0,
        };

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Compute Params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Compute Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                read_entry(1, wgpu::ShaderStages::COMPUTE),
                read_entry(2, wgpu::ShaderStages::COMPUTE),
                write_entry(3),
                write_entry(4),
            ],
        });

        let bind_groups = [0usize, 1].map(|write| {
            let src = particles.slots.get(write ^ 1);
            let dst = particles.slots.get(write);
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Particle Compute Bind Group (write {})", write)),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&src.pos_and_life_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&src.vel_and_scale_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&dst.pos_and_life_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::TextureView(&dst.vel_and_scale_view),
                    },
                ],
            })
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Compute Shader"),
            source: wgpu::ShaderSource::Wgsl(COMPUTE_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Compute Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        Self {
            init_pipeline: make_pipeline("cs_init_buffers"),
            update_pipeline: make_pipeline("cs_update_buffers"),
            params_buffer,
            bind_groups,
            side: grid.side(),
            workgroups: grid.workgroups(),
            seed,
        }
    }

    /// Change the seed used by the next `cs_init_buffers` dispatch.
    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
    }

    /// Upload this frame's kernel uniforms.
    pub fn write_params(&self, queue: &wgpu::Queue, config: &SceneConfig, time: f32) {
        let params = ComputeParams {
            stay_in_cube_range: config.stay_in_cube_range,
            time_delta: config.time_delta,
            time,
            seed: self.seed,
            side: self.side,
            _pad: 0,
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
    }

    /// Seed `slot` with fresh particles.
    pub fn encode_init(&self, encoder: &mut wgpu::CommandEncoder, slot: usize) {
        self.dispatch(encoder, "cs_init_buffers", &self.init_pipeline, slot);
    }

    /// Step particles from the other slot into `slot`.
    pub fn encode_update(&self, encoder: &mut wgpu::CommandEncoder, slot: usize) {
        self.dispatch(encoder, "cs_update_buffers", &self.update_pipeline, slot);
    }

    fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::ComputePipeline,
        write_slot: usize,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_groups[write_slot], &[]);
        pass.dispatch_workgroups(self.workgroups, self.workgroups, 1);
    }
}

pub(crate) const COMPUTE_SHADER: &str = r#"
struct Params {
    stay_in_cube_range: vec3<f32>,
    time_delta: f32,
    time: f32,
    seed: u32,
    side: u32,
    _pad: u32,
};

struct Particle {
    pos_and_life: vec4<f32>,
    vel_and_scale: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> params: Params;

@group(0) @binding(1)
var u_p_pos_and_life: texture_2d<f32>;

@group(0) @binding(2)
var u_p_vel_and_scale: texture_2d<f32>;

@group(0) @binding(3)
var out_pos_and_life: texture_storage_2d<rgba32float, write>;

@group(0) @binding(4)
var out_vel_and_scale: texture_storage_2d<rgba32float, write>;

fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 16u);
    x = x * 0x7feb352du;
    x = x ^ (x >> 15u);
    x = x * 0x846ca68bu;
    x = x ^ (x >> 16u);
    return x;
}

fn rand01(n: u32) -> f32 {
    return f32(hash(n) & 0x00ffffffu) / 16777216.0;
}

fn rand_signed3(n: u32) -> vec3<f32> {
    let k = n * 3u;
    return vec3<f32>(rand01(k), rand01(k + 1u), rand01(k + 2u)) * 2.0 - 1.0;
}

fn spawn_particle(id: u32, salt: u32) -> Particle {
    let key = id * 7919u + salt * 104729u + params.seed;
    let range = params.stay_in_cube_range;

    var p: Particle;
    let pos = rand_signed3(key) * range * 0.5;
    let life = 0.5 + rand01(key + 11u) * 0.5;
    let vel = rand_signed3(key + 23u) * 0.5;
    let scale = 0.25 + rand01(key + 37u) * 0.35;
    p.pos_and_life = vec4<f32>(pos, life);
    p.vel_and_scale = vec4<f32>(vel, scale);
    return p;
}

fn in_grid(gid: vec3<u32>) -> bool {
    return gid.x < params.side && gid.y < params.side;
}

@compute @workgroup_size(8, 8, 1)
fn cs_init_buffers(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (!in_grid(gid)) {
        return;
    }
    let id = gid.y * params.side + gid.x;
    let p = spawn_particle(id, 0u);
    let coord = vec2<i32>(gid.xy);
    textureStore(out_pos_and_life, coord, p.pos_and_life);
    textureStore(out_vel_and_scale, coord, p.vel_and_scale);
}

@compute @workgroup_size(8, 8, 1)
fn cs_update_buffers(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (!in_grid(gid)) {
        return;
    }
    let coord = vec2<i32>(gid.xy);
    let pos_life = textureLoad(u_p_pos_and_life, coord, 0);
    let vel_scale = textureLoad(u_p_vel_and_scale, coord, 0);

    let dt = params.time_delta;
    let range = params.stay_in_cube_range;
    var pos = pos_life.xyz;
    var life = pos_life.w;
    var vel = vel_scale.xyz;
    let scale = vel_scale.w;

    // Swirl around the y axis, bob vertically, and drift toward the center
    let swirl = vec3<f32>(-pos.z, 0.0, pos.x) * 0.6;
    let bob = vec3<f32>(0.0, sin(params.time * 0.9 + pos.x * 1.7) * 0.8, 0.0);
    let pull = -pos * 0.15;
    vel = vel + (swirl + bob + pull) * dt;

    // Push back anything outside the cube
    let over = max(abs(pos) - range, vec3<f32>(0.0));
    vel = vel - sign(pos) * over * 4.0 * dt;

    vel = vel * (1.0 - 0.2 * dt);
    pos = pos + vel * dt;
    life = life - dt * 0.05;

    var out_pos = vec4<f32>(pos, life);
    var out_vel = vec4<f32>(vel, scale);
    if (life <= 0.0) {
        let id = gid.y * params.side + gid.x;
        let p = spawn_particle(id, u32(params.time * 60.0) + 1u);
        out_pos = p.pos_and_life;
        out_vel = p.vel_and_scale;
    }

    textureStore(out_pos_and_life, coord, out_pos);
    textureStore(out_vel_and_scale, coord, out_vel);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_layout_matches_wgsl() {
        // vec3 + f32 packs into 16 bytes, followed by four 4-byte scalars
        assert_eq!(std::mem::size_of::<ComputeParams>(), 32);
    }

    #[test]
    fn test_compute_shader_valid() {
        let module = super::super::validate_wgsl(COMPUTE_SHADER).unwrap();
        let entry_points: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(entry_points.contains(&"cs_init_buffers"));
        assert!(entry_points.contains(&"cs_update_buffers"));
        for ep in &module.entry_points {
            assert_eq!(ep.workgroup_size, [8, 8, 1]);
        }
    }
}
