//! GPU resources and per-frame orchestration.
//!
//! A frame runs, in order:
//! 1. `cs_init_buffers` if the particle field needs seeding
//! 2. `cs_update_buffers` from the previous slot into the current one,
//!    unless paused
//! 3. the scene pass (clear, then the instanced debug mesh if enabled)
//! 4. the composite: metaballs over the scene, optionally at reduced
//!    resolution, or a plain copy when ray marching is off
//! 5. the ping-pong swap

mod blit;
mod instanced;
mod metaball;
mod particle_compute;
mod particle_textures;
mod targets;

use std::sync::Arc;

use winit::window::Window;

use crate::camera::{CameraMatrices, OrbitCamera, Projection};
use crate::config::SceneConfig;
use crate::error::GpuError;
use crate::frame::{CompositeMode, FramePlan, FrameSchedule};
use crate::grid::ParticleGrid;
use crate::mesh::MeshData;
use crate::sky::Cubemap;

use blit::BlitPass;
use instanced::DebugMeshRenderer;
use metaball::{MetaballPass, SkyTexture};
use particle_compute::ParticleCompute;
use particle_textures::ParticleTextures;
use targets::{ColorTarget, SceneTarget};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.05,
    a: 1.0,
};

/// Fullscreen triangle vertex stage shared by the screen-space passes.
const FULLSCREEN_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(2.0, 1.0),
        vec2<f32>(0.0, -1.0),
    );

    var out: VertexOutput;
    out.clip_position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    out.uv = uvs[vertex_index];
    return out;
}
"#;

/// Prepend the fullscreen vertex stage to a fragment shader.
fn fullscreen_shader(fragment: &str) -> String {
    format!("{}\n{}", FULLSCREEN_VERTEX, fragment)
}

/// Per-frame inputs from the app.
pub struct FrameInput<'a> {
    pub config: &'a SceneConfig,
    pub camera: &'a OrbitCamera,
    /// Seconds since start, excluding pauses.
    pub time: f32,
    /// Run the particle update and swap slots. Off while paused.
    pub simulate: bool,
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    projection: Projection,
    particles: ParticleTextures,
    compute: ParticleCompute,
    debug_mesh: DebugMeshRenderer,
    metaball: MetaballPass,
    blit: BlitPass,
    sky: SkyTexture,
    scene: SceneTarget,
    scene_blit: wgpu::BindGroup,
    downsample: Option<(ColorTarget, wgpu::BindGroup)>,
    schedule: FrameSchedule,
}

impl GpuState {
    pub async fn new(
        window: Arc<Window>,
        scene_config: &SceneConfig,
        grid: ParticleGrid,
        cubemap: &Cubemap,
        seed: u32,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("Using adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let particles = ParticleTextures::new(&device, grid);
        let compute = ParticleCompute::new(&device, &particles, seed);

        let mesh = MeshData::build(scene_config.debug_mesh);
        let debug_mesh = DebugMeshRenderer::new(&device, &mesh, &particles, surface_format);

        let sky = SkyTexture::new(&device, &queue, cubemap);
        let scene = SceneTarget::new(&device, config.width, config.height, surface_format);
        let metaball = MetaballPass::new(&device, &particles, &sky, &scene.color.view, surface_format);
        let blit = BlitPass::new(&device, surface_format);
        let scene_blit = blit.bind_source(&device, &scene.color.view);

        log::info!(
            "GPU ready: {} particles ({}x{}), surface {}x{} {:?}",
            grid.count(),
            grid.side(),
            grid.side(),
            config.width,
            config.height,
            surface_format
        );

        Ok(Self {
            surface,
            device,
            queue,
            projection: Projection::new(config.width, config.height),
            config,
            particles,
            compute,
            debug_mesh,
            metaball,
            blit,
            sky,
            scene,
            scene_blit,
            downsample: None,
            schedule: FrameSchedule::new(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.projection.resize(new_size.width, new_size.height);

        self.scene = SceneTarget::new(
            &self.device,
            self.config.width,
            self.config.height,
            self.config.format,
        );
        self.metaball
            .rebind_scene(&self.device, &self.particles, &self.sky, &self.scene.color.view);
        self.scene_blit = self.blit.bind_source(&self.device, &self.scene.color.view);
        self.downsample = None;
        log::debug!("Resized to {}x{}", new_size.width, new_size.height);
    }

    /// Re-seed the particle field on the next frame.
    pub fn reset_particles(&mut self, seed: u32) {
        self.compute.set_seed(seed);
        self.schedule.reseed();
    }

    pub fn render(&mut self, input: &FrameInput<'_>) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let plan = FramePlan::new(input.config, self.config.width, self.config.height);
        let matrices = CameraMatrices::new(input.camera, &self.projection);

        self.compute.write_params(&self.queue, input.config, input.time);
        self.debug_mesh.write_uniforms(&self.queue, &matrices);
        self.metaball.write_params(&self.queue, &matrices, input.config.epsilon);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let steps = self.schedule.begin(&self.particles.slots, input.simulate);
        if let Some(init_slot) = steps.init {
            self.compute.encode_init(&mut encoder, init_slot);
        }
        if let Some(update_slot) = steps.update {
            self.compute.encode_update(&mut encoder, update_slot);
        }
        let slot = steps.render;

        {
            let mut scene_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.scene.color.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.scene.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if plan.draw_debug_mesh {
                self.debug_mesh.draw(&mut scene_pass, slot);
            }
        }

        match plan.composite {
            CompositeMode::Passthrough => {
                self.blit.draw(&mut encoder, &surface_view, &self.scene_blit);
            }
            CompositeMode::Raymarch => {
                self.metaball.draw(&mut encoder, &surface_view, slot);
            }
            CompositeMode::RaymarchDownsampled { width, height } => {
                let stale = self
                    .downsample
                    .as_ref()
                    .is_none_or(|(target, _)| !target.matches(width, height));
                if stale {
                    let target = ColorTarget::new(
                        &self.device,
                        "Downsample Texture",
                        width,
                        height,
                        self.config.format,
                    );
                    let bind_group = self.blit.bind_source(&self.device, &target.view);
                    log::debug!("Downsample target {}x{}", width, height);
                    self.downsample = Some((target, bind_group));
                }
                if let Some((target, bind_group)) = &self.downsample {
                    self.metaball.draw(&mut encoder, &target.view, slot);
                    self.blit.draw(&mut encoder, &surface_view, bind_group);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.schedule.finish(&steps, &mut self.particles.slots);

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn validate_wgsl(code: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(code)
        .map_err(|e| format!("WGSL parse error: {}", e.emit_to_string(code)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullscreen_shader_prefixes_vertex_stage() {
        let src = fullscreen_shader("// fragment");
        assert!(src.starts_with(FULLSCREEN_VERTEX));
        assert!(src.ends_with("// fragment"));
    }
}
