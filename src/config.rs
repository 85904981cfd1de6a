//! Scene configuration.
//!
//! Every knob the demo exposes lives in [`SceneConfig`]. Configs can be
//! built in code with the `with_*` setters, or loaded from a TOML file where
//! missing keys fall back to their defaults:
//!
//! ```toml
//! particle_count = 256
//! epsilon = 0.002
//! stay_in_cube_range = [4.0, 2.0, 4.0]
//! debug_mesh = "cube"
//! ```
//!
//! Ranged fields are clamped on every setter and after every load, so a
//! config handed to the renderer is always within range.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mesh::MeshShape;

/// Range of the per-step simulation time delta.
pub const TIME_DELTA_RANGE: (f32, f32) = (0.0, 1.0);
/// Range of the metaball downsample divisor.
pub const DOWNSAMPLE_RATE_RANGE: (f32, f32) = (1.0, 3.0);
/// Range of each half-extent of the confining cube.
pub const CUBE_RANGE: (f32, f32) = (1.0, 5.0);
/// Range of the ray-march surface epsilon.
pub const EPSILON_RANGE: (f32, f32) = (0.0001, 0.01);

/// Tunables for the particle field, the debug mesh and the metaball pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Simulation step passed to the update kernel each frame.
    pub time_delta: f32,
    /// Render the metaball pass into a smaller target and upscale it.
    pub downsample: bool,
    /// Divisor applied to the surface size when downsampling.
    pub downsample_rate: f32,
    /// Half-extents of the box particles are pushed back into.
    pub stay_in_cube_range: [f32; 3],
    /// Number of particles. Must be a perfect square.
    pub particle_count: u32,
    /// Hit threshold and normal-estimation offset for the ray march.
    pub epsilon: f32,
    /// Draw the instanced debug mesh.
    pub render_debug_mesh: bool,
    /// Composite the ray-marched metaballs over the scene.
    pub render_raymarch: bool,
    /// Geometry used for each debug instance.
    pub debug_mesh: MeshShape,
    /// Directory with `px nx py ny pz nz` face images. `None` uses a generated sky.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sky: Option<PathBuf>,
    /// Drive the camera from the frame counter instead of the mouse.
    pub auto_orbit: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            time_delta: 0.1,
            downsample: false,
            downsample_rate: 2.0,
            stay_in_cube_range: [3.0, 3.0, 3.0],
            particle_count: 64,
            epsilon: 0.001,
            render_debug_mesh: true,
            render_raymarch: true,
            debug_mesh: MeshShape::Icosphere,
            sky: None,
            auto_orbit: true,
            window_width: 1280,
            window_height: 720,
        }
    }
}

fn clamp_to(value: f32, range: (f32, f32)) -> f32 {
    if value.is_nan() {
        return range.0;
    }
    value.clamp(range.0, range.1)
}

impl SceneConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulation time delta (clamped to 0..=1).
    pub fn with_time_delta(mut self, time_delta: f32) -> Self {
        self.time_delta = clamp_to(time_delta, TIME_DELTA_RANGE);
        self
    }

    /// Enable downsampled metaball rendering at the given rate (clamped to 1..=3).
    pub fn with_downsample(mut self, rate: f32) -> Self {
        self.downsample = true;
        self.downsample_rate = clamp_to(rate, DOWNSAMPLE_RATE_RANGE);
        self
    }

    /// Set the confining cube half-extents (each clamped to 1..=5).
    pub fn with_cube_range(mut self, range: Vec3) -> Self {
        self.stay_in_cube_range = [
            clamp_to(range.x, CUBE_RANGE),
            clamp_to(range.y, CUBE_RANGE),
            clamp_to(range.z, CUBE_RANGE),
        ];
        self
    }

    /// Set the particle count. Validated when the particle grid is built.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the ray-march epsilon (clamped to 0.0001..=0.01).
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = clamp_to(epsilon, EPSILON_RANGE);
        self
    }

    /// Choose the debug instance geometry.
    pub fn with_debug_mesh(mut self, shape: MeshShape) -> Self {
        self.debug_mesh = shape;
        self
    }

    /// Load the sky cubemap from a directory of face images.
    pub fn with_sky(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sky = Some(dir.into());
        self
    }

    /// Enable or disable the instanced debug mesh.
    pub fn with_debug_mesh_enabled(mut self, enabled: bool) -> Self {
        self.render_debug_mesh = enabled;
        self
    }

    /// Enable or disable the metaball pass.
    pub fn with_raymarch_enabled(mut self, enabled: bool) -> Self {
        self.render_raymarch = enabled;
        self
    }

    /// Confining cube half-extents as a vector.
    pub fn cube_range(&self) -> Vec3 {
        Vec3::from_array(self.stay_in_cube_range)
    }

    /// Clamp every ranged field into its valid range.
    pub fn sanitized(mut self) -> Self {
        self.time_delta = clamp_to(self.time_delta, TIME_DELTA_RANGE);
        self.downsample_rate = clamp_to(self.downsample_rate, DOWNSAMPLE_RATE_RANGE);
        for extent in &mut self.stay_in_cube_range {
            *extent = clamp_to(*extent, CUBE_RANGE);
        }
        self.epsilon = clamp_to(self.epsilon, EPSILON_RANGE);
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        self
    }

    /// Parse a config from TOML text. Missing keys use defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = toml::from_str(text)?;
        Ok(config.sanitized())
    }

    /// Serialize to pretty-printed TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded scene config from {}", path.display());
        Ok(config)
    }

    /// Save the config to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_in_range() {
        let config = SceneConfig::default();
        assert_eq!(config.particle_count, 64);
        assert!(config.render_debug_mesh);
        assert!(config.render_raymarch);
        assert!(!config.downsample);
        assert_eq!(config.clone().sanitized(), config);
    }

    #[test]
    fn test_setters_clamp() {
        let config = SceneConfig::new()
            .with_time_delta(4.0)
            .with_downsample(10.0)
            .with_cube_range(Vec3::new(0.0, 2.5, 9.0))
            .with_epsilon(0.0);

        assert_eq!(config.time_delta, 1.0);
        assert!(config.downsample);
        assert_eq!(config.downsample_rate, 3.0);
        assert_eq!(config.stay_in_cube_range, [1.0, 2.5, 5.0]);
        assert_eq!(config.epsilon, 0.0001);
    }

    #[test]
    fn test_nan_clamps_to_lower_bound() {
        let config = SceneConfig::new().with_time_delta(f32::NAN);
        assert_eq!(config.time_delta, 0.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = SceneConfig::from_toml_str(
            r#"
particle_count = 256
debug_mesh = "cube"
"#,
        )
        .unwrap();

        assert_eq!(config.particle_count, 256);
        assert_eq!(config.debug_mesh, MeshShape::Cube);
        assert_eq!(config.epsilon, SceneConfig::default().epsilon);
        assert_eq!(config.sky, None);
    }

    #[test]
    fn test_toml_values_are_sanitized() {
        let config = SceneConfig::from_toml_str(
            r#"
epsilon = 1.0
stay_in_cube_range = [0.5, 3.0, 7.0]
"#,
        )
        .unwrap();

        assert_eq!(config.epsilon, 0.01);
        assert_eq!(config.stay_in_cube_range, [1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = SceneConfig::from_toml_str("particle_count = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SceneConfig::new()
            .with_particle_count(1024)
            .with_sky("assets/sky")
            .with_debug_mesh(MeshShape::Octahedron);
        let text = config.to_toml_string().unwrap();
        let parsed = SceneConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
