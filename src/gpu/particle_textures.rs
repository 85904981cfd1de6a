//! Double-buffered particle state textures.
//!
//! Each slot holds two `side × side` float textures:
//! - `pos_and_life`: xyz position, w remaining life
//! - `vel_and_scale`: xyz velocity, w radius scale
//!
//! Kernels write them as storage textures and every other pass reads them
//! with `textureLoad`, so they are never filtered.

use crate::grid::ParticleGrid;
use crate::pingpong::PingPong;

/// 32-bit float channels to hold positions and velocities exactly.
pub const PARTICLE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// One slot of particle state.
pub struct ParticleSlot {
    #[allow(dead_code)]
    pos_and_life: wgpu::Texture,
    pub pos_and_life_view: wgpu::TextureView,
    #[allow(dead_code)]
    vel_and_scale: wgpu::Texture,
    pub vel_and_scale_view: wgpu::TextureView,
}

impl ParticleSlot {
    fn new(device: &wgpu::Device, grid: &ParticleGrid, slot: usize) -> Self {
        let make = |name: &str| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&format!("Particle {} Texture {}", name, slot)),
                size: grid.extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: PARTICLE_FORMAT,
                usage: wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        };

        let (pos_and_life, pos_and_life_view) = make("Pos/Life");
        let (vel_and_scale, vel_and_scale_view) = make("Vel/Scale");
        Self {
            pos_and_life,
            pos_and_life_view,
            vel_and_scale,
            vel_and_scale_view,
        }
    }
}

/// Both slots plus the grid they are laid out on.
pub struct ParticleTextures {
    pub grid: ParticleGrid,
    pub slots: PingPong<ParticleSlot>,
}

impl ParticleTextures {
    pub fn new(device: &wgpu::Device, grid: ParticleGrid) -> Self {
        let slots = PingPong::from_fn(|slot| ParticleSlot::new(device, &grid, slot));
        log::debug!(
            "Allocated particle textures: {}x{} x2 slots",
            grid.side(),
            grid.side()
        );
        Self { grid, slots }
    }
}

/// Bind group layout entry for reading a particle texture.
pub(crate) fn read_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Bind group layout entry for writing a particle texture from a kernel.
pub(crate) fn write_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: PARTICLE_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    }
}
