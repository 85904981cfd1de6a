//! # Metaball Particles
//!
//! A GPU particle field drawn two ways at once: as instanced debug meshes,
//! and as a ray-marched metaball surface composited over them, seen from an
//! orbiting camera.
//!
//! ## Quick Start
//!
//! ```ignore
//! use metaball_particles::SceneConfig;
//!
//! fn main() -> Result<(), metaball_particles::RunError> {
//!     metaball_particles::run(SceneConfig::default().with_particle_count(256))
//! }
//! ```
//!
//! ## Frame Structure
//!
//! Particle state lives in two pairs of float textures used ping-pong
//! style: each frame the update kernel reads last frame's pair and writes
//! the other, both render passes read what was just written, and then the
//! roles flip. [`FrameSchedule`] decides which slot each step touches,
//! [`ParticleGrid`] lays particles out on the textures, and [`FramePlan`]
//! picks the render passes.

pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
mod gpu;
pub mod grid;
pub mod input;
pub mod mesh;
pub mod pingpong;
pub mod sky;
pub mod time;
mod window;

pub use camera::{CameraMatrices, OrbitCamera, Projection};
pub use config::SceneConfig;
pub use error::{ConfigError, GpuError, RunError, TextureError};
pub use frame::{CompositeMode, FramePlan, FrameSchedule};
pub use grid::ParticleGrid;
pub use mesh::{MeshData, MeshShape};
pub use pingpong::PingPong;
pub use sky::Cubemap;

use winit::event_loop::{ControlFlow, EventLoop};

/// Edge length of the generated sky faces.
const PROCEDURAL_SKY_SIZE: u32 = 128;

/// Load the sky named by `config`, or generate one.
pub fn load_sky(config: &SceneConfig) -> Result<Cubemap, TextureError> {
    match &config.sky {
        Some(dir) => Cubemap::load_dir(dir),
        None => Ok(Cubemap::procedural(PROCEDURAL_SKY_SIZE)),
    }
}

/// Open a window and run the demo until it is closed.
///
/// # Errors
///
/// Fails before opening a window if the particle count cannot be laid out
/// or the sky cannot be loaded, and afterwards if the window or GPU cannot
/// be initialized.
pub fn run(config: SceneConfig) -> Result<(), RunError> {
    let config = config.sanitized();
    let grid = ParticleGrid::new(config.particle_count)?;
    let sky = load_sky(&config)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = window::App::new(config, grid, sky);
    event_loop.run_app(&mut app)?;

    match app.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
